//! Patient service.
//!
//! [`PatientService`] coordinates the three resources behind every operation: the document
//! storage, the database and the notifier. The ordering rules are:
//!
//! - new document bytes are written *before* the transaction opens, and removed again if the
//!   transaction does not commit;
//! - superseded or deleted document bytes are removed only *after* the commit, and a failure to
//!   remove them is logged, never reported to the caller;
//! - the registration email is dispatched only after the commit, and never awaited.

use crate::constants::CONFIRMATION_EMAIL_SUBJECT;
use crate::error::DOCUMENT_NOT_FOUND;
use crate::models::{DocumentContent, FileRecord, PatientPage, PatientRecord, PatientView};
use crate::repositories::{files, patients};
use crate::validation::{
    ensure_patch_not_empty, DocumentUpload, PageRequest, PatientDraft, PatientPatch,
};
use crate::{PatientError, PatientResult, UnitOfWork};
use chrono::{DateTime, Utc};
use registry_files::{DocumentContentType, FileStorage, FilesError, StoredFile};
use registry_notify::{NotificationDispatcher, NotificationMessage};
use sqlx::SqlitePool;
use std::sync::Arc;
use uuid::Uuid;

/// Patient operations over the database, the document storage and the notifier.
#[derive(Clone)]
pub struct PatientService {
    pool: SqlitePool,
    storage: Arc<dyn FileStorage>,
    notifications: NotificationDispatcher,
    max_document_bytes: u64,
}

impl PatientService {
    pub fn new(
        pool: SqlitePool,
        storage: Arc<dyn FileStorage>,
        notifications: NotificationDispatcher,
        max_document_bytes: u64,
    ) -> Self {
        Self {
            pool,
            storage,
            notifications,
            max_document_bytes,
        }
    }

    pub fn max_document_bytes(&self) -> u64 {
        self.max_document_bytes
    }

    pub fn notifier_kind(&self) -> &'static str {
        self.notifications.kind()
    }

    /// Registers a patient together with their document photo.
    ///
    /// # Errors
    ///
    /// - `Duplicate` if the email is already registered,
    /// - `InvalidPayload` if the document has the wrong type or size,
    /// - `Storage` / `Database` if persisting fails; nothing is left behind in either case.
    pub async fn create(
        &self,
        draft: PatientDraft,
        document: DocumentUpload,
    ) -> PatientResult<PatientView> {
        self.ensure_email_available(draft.email.as_str(), None).await?;
        let content_type = document.validate(self.max_document_bytes)?;
        let stored = self.store(&document, content_type).await?;

        let now = Utc::now();
        let file = FileRecord::from_stored(&stored, now);
        let patient = PatientRecord {
            id: Uuid::new_v4(),
            full_name: draft.full_name.as_str().to_string(),
            email: draft.email.as_str().to_string(),
            phone_number: draft.phone_number.as_str().to_string(),
            document_file_id: file.id,
            created_at: now,
            updated_at: now,
        };

        if let Err(e) = self.persist_new(&patient, &file).await {
            remove_document_bytes(self.storage.clone(), file.storage_path.clone()).await;
            return Err(e);
        }

        tracing::info!(patient_id = %patient.id, file_id = %file.id, "patient created");
        Ok(PatientView {
            patient,
            document: file,
        })
    }

    async fn persist_new(&self, patient: &PatientRecord, file: &FileRecord) -> PatientResult<()> {
        let mut uow = UnitOfWork::begin(&self.pool).await?;
        files::insert(uow.conn(), file).await?;
        patients::insert(uow.conn(), patient)
            .await
            .map_err(PatientError::from_write)?;

        let dispatcher = self.notifications.clone();
        let message = confirmation_message(patient);
        uow.after_commit(async move { dispatcher.dispatch(message) });

        uow.commit().await
    }

    pub async fn list(&self, request: PageRequest) -> PatientResult<PatientPage> {
        let mut conn = self.pool.acquire().await?;
        let total = patients::count(&mut conn).await?;
        let items =
            patients::list(&mut conn, request.offset(), i64::from(request.size())).await?;

        Ok(PatientPage {
            items,
            page: request.page(),
            size: request.size(),
            total,
        })
    }

    pub async fn get(&self, id: Uuid) -> PatientResult<PatientView> {
        let mut conn = self.pool.acquire().await?;
        patients::find_by_id(&mut conn, id)
            .await?
            .ok_or_else(PatientError::patient_not_found)
    }

    /// Reads the stored bytes of a patient's document photo.
    pub async fn document(&self, id: Uuid) -> PatientResult<DocumentContent> {
        let view = self.get(id).await?;
        let bytes = self
            .storage
            .retrieve(&view.document.storage_path)
            .await
            .map_err(|e| match e {
                FilesError::NotFound(_) => PatientError::NotFound(DOCUMENT_NOT_FOUND.into()),
                other => other.into(),
            })?;

        Ok(DocumentContent {
            bytes,
            content_type: view.document.content_type,
            original_filename: view.document.original_filename,
        })
    }

    /// Full replace of the patient's fields, optionally swapping the document photo.
    pub async fn replace(
        &self,
        id: Uuid,
        draft: PatientDraft,
        document: Option<DocumentUpload>,
    ) -> PatientResult<PatientView> {
        let patch = PatientPatch {
            full_name: Some(draft.full_name),
            email: Some(draft.email),
            phone_number: Some(draft.phone_number),
        };
        self.update(id, patch, document).await
    }

    /// Partial update; at least one field or a document must be supplied.
    pub async fn patch(
        &self,
        id: Uuid,
        patch: PatientPatch,
        document: Option<DocumentUpload>,
    ) -> PatientResult<PatientView> {
        ensure_patch_not_empty(&patch, document.as_ref())?;
        self.update(id, patch, document).await
    }

    async fn update(
        &self,
        id: Uuid,
        patch: PatientPatch,
        document: Option<DocumentUpload>,
    ) -> PatientResult<PatientView> {
        // Fail fast before any bytes are written; the transaction re-reads the row.
        self.get(id).await?;
        if let Some(email) = &patch.email {
            self.ensure_email_available(email.as_str(), Some(id)).await?;
        }

        let now = Utc::now();
        let new_file = match &document {
            Some(document) => {
                let content_type = document.validate(self.max_document_bytes)?;
                let stored = self.store(document, content_type).await?;
                Some(FileRecord::from_stored(&stored, now))
            }
            None => None,
        };

        let view = match self.persist_update(id, patch, new_file.as_ref(), now).await {
            Ok(view) => view,
            Err(e) => {
                if let Some(file) = &new_file {
                    remove_document_bytes(self.storage.clone(), file.storage_path.clone()).await;
                }
                return Err(e);
            }
        };

        tracing::info!(
            patient_id = %view.patient.id,
            document_replaced = new_file.is_some(),
            "patient updated"
        );
        Ok(view)
    }

    /// Applies `patch` to the row as it stands inside the transaction. The first statement is a
    /// write, so the row and its current document cannot change underneath.
    async fn persist_update(
        &self,
        id: Uuid,
        patch: PatientPatch,
        new_file: Option<&FileRecord>,
        now: DateTime<Utc>,
    ) -> PatientResult<PatientView> {
        let mut uow = UnitOfWork::begin(&self.pool).await?;

        if !patients::touch(uow.conn(), id, now).await? {
            // Deleted between the read and the transaction.
            uow.rollback().await?;
            return Err(PatientError::patient_not_found());
        }
        let Some(current) = patients::find_by_id(uow.conn(), id).await? else {
            uow.rollback().await?;
            return Err(PatientError::patient_not_found());
        };

        let mut patient = current.patient;
        if let Some(full_name) = patch.full_name {
            patient.full_name = full_name.as_str().to_string();
        }
        if let Some(email) = patch.email {
            patient.email = email.as_str().to_string();
        }
        if let Some(phone_number) = patch.phone_number {
            patient.phone_number = phone_number.as_str().to_string();
        }
        patient.updated_at = now;

        let document = match new_file {
            Some(file) => {
                files::insert(uow.conn(), file).await?;
                patient.document_file_id = file.id;
                file.clone()
            }
            None => current.document.clone(),
        };

        patients::update(uow.conn(), &patient)
            .await
            .map_err(PatientError::from_write)?;

        if new_file.is_some() {
            let old_file = current.document;
            if !files::delete(uow.conn(), old_file.id).await? {
                uow.rollback().await?;
                return Err(PatientError::NotFound(DOCUMENT_NOT_FOUND.into()));
            }
            uow.after_commit(remove_document_bytes(
                self.storage.clone(),
                old_file.storage_path,
            ));
        }

        uow.commit().await?;
        Ok(PatientView { patient, document })
    }

    /// Deletes the patient and their document. The rows go in one transaction; the bytes follow
    /// after the commit.
    pub async fn delete(&self, id: Uuid) -> PatientResult<()> {
        let mut uow = UnitOfWork::begin(&self.pool).await?;
        let Some(view) = patients::find_by_id(uow.conn(), id).await? else {
            uow.rollback().await?;
            return Err(PatientError::patient_not_found());
        };

        patients::delete(uow.conn(), id).await?;
        files::delete(uow.conn(), view.document.id).await?;
        uow.after_commit(remove_document_bytes(
            self.storage.clone(),
            view.document.storage_path.clone(),
        ));
        uow.commit().await?;

        tracing::info!(patient_id = %id, file_id = %view.document.id, "patient deleted");
        Ok(())
    }

    async fn ensure_email_available(
        &self,
        email: &str,
        excluding: Option<Uuid>,
    ) -> PatientResult<()> {
        let mut conn = self.pool.acquire().await?;
        if patients::email_taken(&mut conn, email, excluding).await? {
            return Err(PatientError::duplicate_email());
        }
        Ok(())
    }

    async fn store(
        &self,
        document: &DocumentUpload,
        content_type: DocumentContentType,
    ) -> PatientResult<StoredFile> {
        let filename = document.filename.as_deref().unwrap_or_default();
        Ok(self
            .storage
            .store(&document.bytes, content_type, filename)
            .await?)
    }
}

impl std::fmt::Debug for PatientService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatientService")
            .field("storage", &self.storage)
            .field("notifications", &self.notifications)
            .field("max_document_bytes", &self.max_document_bytes)
            .finish()
    }
}

fn confirmation_message(patient: &PatientRecord) -> NotificationMessage {
    NotificationMessage {
        recipient: patient.email.clone(),
        recipient_name: Some(patient.full_name.clone()),
        subject: Some(CONFIRMATION_EMAIL_SUBJECT.to_string()),
        body: format!(
            "Hello {}, your patient registration was successful.",
            patient.full_name
        ),
    }
}

async fn remove_document_bytes(storage: Arc<dyn FileStorage>, storage_path: String) {
    if let Err(e) = storage.delete(&storage_path).await {
        tracing::warn!(
            storage_path = %storage_path,
            "failed to remove document bytes: {}",
            e
        );
    }
}
