//! Photo service.
//!
//! Uploads go to blob storage first, then get their metadata rows in one
//! write; a blob whose rows could not be written is removed again. Every read
//! that crosses users is gated by the visibility resolver, and a photo the
//! viewer may not see is reported exactly like a missing one.

use std::collections::HashSet;

use crate::services::notification::NotificationSinkService;
use crate::services::visibility::VisibilityResolver;
use fourcut_common::{AppError, AppResult, IdGenerator, StorageService, generate_storage_key};
use fourcut_db::{
    entities::photo::{self, Visibility},
    repositories::{PhotoStoreService, UserDirectoryService},
};

/// Accepted upload content types.
pub const ALLOWED_CONTENT_TYPES: [&str; 4] = ["image/jpeg", "image/jpg", "image/png", "image/gif"];

/// Input for uploading a photo.
#[derive(Debug, Clone, Default)]
pub struct UploadPhotoInput {
    /// Raw image bytes; must not be empty.
    pub data: Vec<u8>,
    /// MIME type as sent by the client, matched case-insensitively against
    /// [`ALLOWED_CONTENT_TYPES`].
    pub content_type: String,
    /// Client-side file name; only its extension is kept.
    pub file_name: String,
    /// Defaults to [`Visibility::AllFriends`].
    pub visibility: Option<Visibility>,
    /// Users whose albums receive a copy of the photo.
    pub tagged_user_ids: Vec<String>,
}

fn photo_not_found() -> AppError {
    AppError::NotFound("Photo not found".to_string())
}

/// Photo service for business logic.
#[derive(Clone)]
pub struct PhotoService {
    photos: PhotoStoreService,
    storage: StorageService,
    users: UserDirectoryService,
    resolver: VisibilityResolver,
    notifier: Option<NotificationSinkService>,
    id_gen: IdGenerator,
}

impl PhotoService {
    /// Create a new photo service.
    #[must_use]
    pub const fn new(
        photos: PhotoStoreService,
        storage: StorageService,
        users: UserDirectoryService,
        resolver: VisibilityResolver,
    ) -> Self {
        Self {
            photos,
            storage,
            users,
            resolver,
            notifier: None,
            id_gen: IdGenerator::new(),
        }
    }

    /// Set the notification sink used for tag notifications.
    pub fn set_notifier(&mut self, notifier: NotificationSinkService) {
        self.notifier = Some(notifier);
    }

    /// Upload a photo to the owner's album and copy it to tagged users' albums.
    pub async fn upload(
        &self,
        owner_id: &str,
        input: UploadPhotoInput,
    ) -> AppResult<photo::Model> {
        if input.data.is_empty() {
            return Err(AppError::Validation("No file uploaded".to_string()));
        }
        let content_type = input.content_type.to_lowercase();
        if !ALLOWED_CONTENT_TYPES.contains(&content_type.as_str()) {
            return Err(AppError::Validation(format!(
                "Unsupported content type: {}",
                input.content_type
            )));
        }

        let tagged = self.tagged_users(owner_id, &input.tagged_user_ids).await?;
        let tag_message = match self.notifier {
            Some(_) if !tagged.is_empty() => {
                let owner = self.owner_name(owner_id).await;
                Some(format!("{owner} added a photo to your album."))
            }
            _ => None,
        };

        let key = generate_storage_key(owner_id, &input.file_name);
        let file = self.storage.upload(&key, &input.data, &content_type).await?;

        let now = chrono::Utc::now();
        let rows = std::iter::once((owner_id.to_string(), input.visibility.unwrap_or_default()))
            .chain(tagged.iter().map(|id| (id.clone(), Visibility::default())))
            .map(|(owner, visibility)| photo::Model {
                id: self.id_gen.generate(),
                owner_id: owner,
                url: file.url.clone(),
                storage_key: file.key.clone(),
                content_type: content_type.clone(),
                visibility,
                created_at: now.into(),
            })
            .collect();

        let created = match self.photos.create_all(rows).await {
            Ok(created) => created,
            Err(e) => {
                if let Err(cleanup) = self.storage.delete(&file.key).await {
                    tracing::warn!(error = %cleanup, storage_key = %file.key, "Failed to remove orphaned blob");
                }
                return Err(e);
            }
        };
        let owned = created
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Internal("Photo row was not created".to_string()))?;

        tracing::debug!(
            photo_id = %owned.id,
            owner_id = %owner_id,
            size = file.size,
            tagged = tagged.len(),
            "Photo uploaded"
        );

        if let (Some(notifier), Some(message)) = (&self.notifier, tag_message) {
            for user_id in &tagged {
                if let Err(e) = notifier.notify(user_id, &message).await {
                    tracing::warn!(error = %e, user_id = %user_id, "Failed to deliver tag notification");
                }
            }
        }

        Ok(owned)
    }

    /// Get a photo if `viewer_id` may see it.
    pub async fn get(&self, photo_id: &str, viewer_id: &str) -> AppResult<photo::Model> {
        let photo = self
            .photos
            .find_by_id(photo_id)
            .await?
            .ok_or_else(photo_not_found)?;

        if self.resolver.can_view(&photo, viewer_id).await? {
            Ok(photo)
        } else {
            Err(photo_not_found())
        }
    }

    /// The photos in `owner_id`'s album that `viewer_id` may see, newest first.
    pub async fn list_for_user(
        &self,
        owner_id: &str,
        viewer_id: &str,
    ) -> AppResult<Vec<photo::Model>> {
        let photos = self.photos.find_by_owner(owner_id).await?;
        self.resolver
            .filter_visible(owner_id, viewer_id, photos)
            .await
    }

    /// Change the visibility of a photo the caller owns.
    pub async fn update_visibility(
        &self,
        photo_id: &str,
        acting_user_id: &str,
        visibility: Visibility,
    ) -> AppResult<photo::Model> {
        let photo = self.owned_photo(photo_id, acting_user_id).await?;
        self.photos.update_visibility(&photo.id, visibility).await
    }

    /// Delete a photo the caller owns, and its blob once nothing else uses it.
    pub async fn delete(&self, photo_id: &str, acting_user_id: &str) -> AppResult<()> {
        let photo = self.owned_photo(photo_id, acting_user_id).await?;
        self.photos.delete(&photo.id).await?;

        if self.photos.count_by_storage_key(&photo.storage_key).await? == 0 {
            self.storage.delete(&photo.storage_key).await?;
            tracing::debug!(storage_key = %photo.storage_key, "Photo blob deleted");
        }

        tracing::debug!(photo_id = %photo.id, "Photo deleted");
        Ok(())
    }

    async fn owned_photo(&self, photo_id: &str, acting_user_id: &str) -> AppResult<photo::Model> {
        self.photos
            .find_by_id(photo_id)
            .await?
            .filter(|p| p.owner_id == acting_user_id)
            .ok_or_else(photo_not_found)
    }

    /// Owner nickname for tag notices. Lookup failures degrade to "A friend".
    async fn owner_name(&self, owner_id: &str) -> String {
        match self.users.find_by_id(owner_id).await {
            Ok(Some(user)) => user.nickname,
            Ok(None) => "A friend".to_string(),
            Err(e) => {
                tracing::warn!(error = %e, user_id = %owner_id, "Owner lookup failed");
                "A friend".to_string()
            }
        }
    }

    /// Distinct, known tagged users other than the owner, in input order.
    async fn tagged_users(&self, owner_id: &str, requested: &[String]) -> AppResult<Vec<String>> {
        let mut seen = HashSet::new();
        let candidates: Vec<String> = requested
            .iter()
            .filter(|id| id.as_str() != owner_id && seen.insert(id.as_str()))
            .cloned()
            .collect();
        if candidates.is_empty() {
            return Ok(candidates);
        }

        let known: HashSet<String> = self
            .users
            .find_by_ids(&candidates)
            .await?
            .into_iter()
            .map(|u| u.id)
            .collect();

        Ok(candidates
            .into_iter()
            .filter(|id| {
                let exists = known.contains(id);
                if !exists {
                    tracing::debug!(user_id = %id, "Skipping unknown tagged user");
                }
                exists
            })
            .collect())
    }
}
