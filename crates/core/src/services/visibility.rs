//! Visibility resolution for photos.
//!
//! [`can_view`] is the policy itself and never touches storage.
//! [`VisibilityResolver`] looks up the friendship facts it needs through the
//! relationship engine and applies the policy.

use fourcut_common::AppResult;
use fourcut_db::entities::{
    friendship,
    photo::{self, Visibility},
};

use crate::services::relationship::RelationshipEngine;

/// What the friendship graph says about an owner and a viewer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewerRelation {
    /// An accepted friendship exists between the two.
    pub is_friend: bool,
    /// The owner has marked the viewer as a close friend.
    pub owner_marked_close: bool,
}

impl ViewerRelation {
    /// Derive the relation from the pair's stored record.
    ///
    /// Only an accepted record counts, and only the flag on the owner's side
    /// of it. The viewer's own flag is irrelevant.
    #[must_use]
    pub fn from_record(record: Option<&friendship::Model>, owner_id: &str) -> Self {
        match record {
            Some(r) if r.is_accepted() => Self {
                is_friend: true,
                owner_marked_close: r.close_friend_flag_of(owner_id) == Some(true),
            },
            _ => Self::default(),
        }
    }
}

/// Whether `viewer_id` may see content owned by `owner_id` at `visibility`.
#[must_use]
pub fn can_view(
    visibility: Visibility,
    owner_id: &str,
    viewer_id: &str,
    relation: ViewerRelation,
) -> bool {
    if viewer_id == owner_id {
        return true;
    }
    match visibility {
        Visibility::Private => false,
        Visibility::CloseFriends => relation.is_friend && relation.owner_marked_close,
        Visibility::AllFriends => relation.is_friend,
    }
}

/// Like [`can_view`] for a tier given by name. Unknown tiers are visible to
/// the owner only.
#[must_use]
pub fn can_view_tier(tier: &str, owner_id: &str, viewer_id: &str, relation: ViewerRelation) -> bool {
    if viewer_id == owner_id {
        return true;
    }
    Visibility::parse(tier).is_some_and(|v| can_view(v, owner_id, viewer_id, relation))
}

/// Applies [`can_view`] using live friendship data.
#[derive(Clone)]
pub struct VisibilityResolver {
    engine: RelationshipEngine,
}

impl VisibilityResolver {
    /// Create a new visibility resolver.
    #[must_use]
    pub const fn new(engine: RelationshipEngine) -> Self {
        Self { engine }
    }

    /// Look up the relation between an owner and a viewer.
    pub async fn relation(&self, owner_id: &str, viewer_id: &str) -> AppResult<ViewerRelation> {
        if owner_id == viewer_id {
            return Ok(ViewerRelation::default());
        }
        let record = self.engine.friendship_between(owner_id, viewer_id).await?;
        Ok(ViewerRelation::from_record(record.as_ref(), owner_id))
    }

    /// Whether `viewer_id` may see `photo`.
    pub async fn can_view(&self, photo: &photo::Model, viewer_id: &str) -> AppResult<bool> {
        let relation = self.relation(&photo.owner_id, viewer_id).await?;
        Ok(can_view(photo.visibility, &photo.owner_id, viewer_id, relation))
    }

    /// Keep only the photos of `owner_id` that `viewer_id` may see.
    ///
    /// The relation is looked up once for the whole batch.
    pub async fn filter_visible(
        &self,
        owner_id: &str,
        viewer_id: &str,
        photos: Vec<photo::Model>,
    ) -> AppResult<Vec<photo::Model>> {
        let relation = self.relation(owner_id, viewer_id).await?;
        Ok(photos
            .into_iter()
            .filter(|p| can_view(p.visibility, &p.owner_id, viewer_id, relation))
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testing::{Fixture, record, sample_photo};
    use fourcut_db::entities::friendship::FriendshipStatus;

    const TIERS: [Visibility; 3] = [
        Visibility::Private,
        Visibility::CloseFriends,
        Visibility::AllFriends,
    ];

    fn relations() -> [ViewerRelation; 4] {
        [
            ViewerRelation::default(),
            ViewerRelation {
                is_friend: true,
                owner_marked_close: false,
            },
            ViewerRelation {
                is_friend: true,
                owner_marked_close: true,
            },
            // Not reachable from a stored record, but the policy must still deny
            ViewerRelation {
                is_friend: false,
                owner_marked_close: true,
            },
        ]
    }

    #[test]
    fn test_owner_always_sees_own_content() {
        for tier in TIERS {
            for relation in relations() {
                assert!(can_view(tier, "alice", "alice", relation));
            }
        }
        assert!(can_view_tier("SOMETHING_ELSE", "alice", "alice", ViewerRelation::default()));
    }

    #[test]
    fn test_private_is_owner_only() {
        for relation in relations() {
            assert!(!can_view(Visibility::Private, "alice", "bob", relation));
        }
    }

    #[test]
    fn test_close_friends_needs_friendship_and_owner_flag() {
        let [none, friend, close, orphan_flag] = relations();
        assert!(!can_view(Visibility::CloseFriends, "alice", "bob", none));
        assert!(!can_view(Visibility::CloseFriends, "alice", "bob", friend));
        assert!(can_view(Visibility::CloseFriends, "alice", "bob", close));
        assert!(!can_view(Visibility::CloseFriends, "alice", "bob", orphan_flag));
    }

    #[test]
    fn test_all_friends_ignores_flags() {
        let [none, friend, close, _] = relations();
        assert!(!can_view(Visibility::AllFriends, "alice", "bob", none));
        assert!(can_view(Visibility::AllFriends, "alice", "bob", friend));
        assert!(can_view(Visibility::AllFriends, "alice", "bob", close));
    }

    #[test]
    fn test_unknown_tier_is_denied() {
        let close = relations()[2];
        assert!(!can_view_tier("PUBLIC", "alice", "bob", close));
        assert!(!can_view_tier("", "alice", "bob", close));
        assert!(can_view_tier("ALL_FRIENDS", "alice", "bob", close));
    }

    #[test]
    fn test_relation_uses_owner_side_flag() {
        // alice requested, bob accepted; only bob marked alice as close
        let mut r = record("f1", "alice", "bob", FriendshipStatus::Accepted);
        r.receiver_close_friend = true;

        let owner_alice = ViewerRelation::from_record(Some(&r), "alice");
        assert!(owner_alice.is_friend);
        assert!(!owner_alice.owner_marked_close);

        let owner_bob = ViewerRelation::from_record(Some(&r), "bob");
        assert!(owner_bob.owner_marked_close);
    }

    #[test]
    fn test_pending_or_rejected_records_are_not_friendship() {
        for status in [FriendshipStatus::Pending, FriendshipStatus::Rejected] {
            let mut r = record("f1", "alice", "bob", status);
            r.requester_close_friend = true;
            assert_eq!(
                ViewerRelation::from_record(Some(&r), "alice"),
                ViewerRelation::default()
            );
        }
    }

    #[tokio::test]
    async fn test_close_friends_scenario() {
        let fx = Fixture::new().await;
        fx.befriend("alice", "bob").await;
        let resolver = VisibilityResolver::new(fx.engine.clone());
        let p = sample_photo("p1", "alice", Visibility::CloseFriends);

        assert!(!resolver.can_view(&p, "bob").await.unwrap());

        // bob marking alice changes nothing for alice's photo
        fx.engine.toggle_close_friend("bob", "alice").await.unwrap();
        assert!(!resolver.can_view(&p, "bob").await.unwrap());

        fx.engine.toggle_close_friend("alice", "bob").await.unwrap();
        assert!(resolver.can_view(&p, "bob").await.unwrap());
        assert!(!resolver.can_view(&p, "carol").await.unwrap());
        assert!(resolver.can_view(&p, "alice").await.unwrap());
    }

    #[tokio::test]
    async fn test_filter_visible() {
        let fx = Fixture::new().await;
        fx.befriend("alice", "bob").await;
        let resolver = VisibilityResolver::new(fx.engine.clone());
        let photos = vec![
            sample_photo("p1", "alice", Visibility::Private),
            sample_photo("p2", "alice", Visibility::CloseFriends),
            sample_photo("p3", "alice", Visibility::AllFriends),
        ];

        let for_bob = resolver
            .filter_visible("alice", "bob", photos.clone())
            .await
            .unwrap();
        assert_eq!(for_bob.len(), 1);
        assert_eq!(for_bob[0].id, "p3");

        let for_carol = resolver
            .filter_visible("alice", "carol", photos.clone())
            .await
            .unwrap();
        assert!(for_carol.is_empty());

        let for_alice = resolver.filter_visible("alice", "alice", photos).await.unwrap();
        assert_eq!(for_alice.len(), 3);
    }
}
