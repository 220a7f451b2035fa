//! Input validation for patient forms and document uploads.
//!
//! Field problems are collected rather than short-circuited, so a client gets every failing field
//! in one `PatientError::Validation`. Document problems are payload errors
//! (`PatientError::InvalidPayload`) and are reported one at a time.

use crate::constants::{DEFAULT_PAGE, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::{FieldError, PatientError, PatientResult};
use registry_files::DocumentContentType;
use registry_types::{EmailAddress, FullName, PhoneNumber, TextError};

pub const FIELD_FULL_NAME: &str = "full_name";
pub const FIELD_EMAIL: &str = "email";
pub const FIELD_PHONE_NUMBER: &str = "phone_number";
pub const FIELD_DOCUMENT_PHOTO: &str = "document_photo";

const FIELD_REQUIRED: &str = "Field required";
const DISALLOWED_DOCUMENT: &str = "Document photo must be PNG or JPG/JPEG.";
const EMPTY_DOCUMENT: &str = "Document photo is empty.";
const EMPTY_PATCH: &str = "At least one field or document photo must be provided.";

/// Raw text fields as submitted by a client; `None` means the field was absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatientForm {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
}

/// Complete, validated patient data for create and full replace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientDraft {
    pub full_name: FullName,
    pub email: EmailAddress,
    pub phone_number: PhoneNumber,
}

/// Validated partial update. Absent fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatientPatch {
    pub full_name: Option<FullName>,
    pub email: Option<EmailAddress>,
    pub phone_number: Option<PhoneNumber>,
}

impl PatientPatch {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none() && self.email.is_none() && self.phone_number.is_none()
    }
}

/// An uploaded document as received, before any checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentUpload {
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl DocumentUpload {
    /// Checks type and size, returning the accepted content type.
    ///
    /// The filename extension must be `jpg`, `jpeg` or `png` and the declared content type must
    /// be the one that extension implies.
    pub fn validate(&self, max_bytes: u64) -> PatientResult<DocumentContentType> {
        let by_extension = self
            .filename
            .as_deref()
            .and_then(DocumentContentType::from_filename);
        let by_mime = self
            .content_type
            .as_deref()
            .and_then(DocumentContentType::from_mime);

        let content_type = match (by_extension, by_mime) {
            (Some(ext), Some(mime)) if ext == mime => ext,
            _ => return Err(PatientError::InvalidPayload(DISALLOWED_DOCUMENT.into())),
        };

        if self.bytes.len() as u64 > max_bytes {
            return Err(PatientError::InvalidPayload(format!(
                "Document photo exceeds max size of {}.",
                describe_size(max_bytes)
            )));
        }
        if self.bytes.is_empty() {
            return Err(PatientError::InvalidPayload(EMPTY_DOCUMENT.into()));
        }

        Ok(content_type)
    }
}

fn describe_size(bytes: u64) -> String {
    const MIB: u64 = 1024 * 1024;
    if bytes >= MIB && bytes % MIB == 0 {
        format!("{}MB", bytes / MIB)
    } else {
        format!("{bytes} bytes")
    }
}

fn check<T>(
    errors: &mut Vec<FieldError>,
    field: &str,
    value: Option<&str>,
    parse: impl FnOnce(&str) -> Result<T, TextError>,
) -> Option<T> {
    let value = value?;
    match parse(value) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            errors.push(FieldError::new(field, e.to_string()));
            None
        }
    }
}

fn require(errors: &mut Vec<FieldError>, field: &str, present: bool) {
    if !present {
        errors.push(FieldError::new(field, FIELD_REQUIRED));
    }
}

impl PatientForm {
    fn check_fields(&self, errors: &mut Vec<FieldError>) -> PatientPatch {
        PatientPatch {
            full_name: check(errors, FIELD_FULL_NAME, self.full_name.as_deref(), |v| {
                FullName::new(v)
            }),
            email: check(errors, FIELD_EMAIL, self.email.as_deref(), |v| {
                EmailAddress::parse(v)
            }),
            phone_number: check(
                errors,
                FIELD_PHONE_NUMBER,
                self.phone_number.as_deref(),
                |v| PhoneNumber::parse(v),
            ),
        }
    }

    fn require_all(&self, errors: &mut Vec<FieldError>) {
        require(errors, FIELD_FULL_NAME, self.full_name.is_some());
        require(errors, FIELD_EMAIL, self.email.is_some());
        require(errors, FIELD_PHONE_NUMBER, self.phone_number.is_some());
    }

    /// Validates a full replace: every field must be present and valid.
    pub fn into_draft(self) -> PatientResult<PatientDraft> {
        let mut errors = Vec::new();
        self.require_all(&mut errors);
        let fields = self.check_fields(&mut errors);
        draft_from(fields, errors)
    }

    /// Validates a create: every field plus the document must be present.
    pub fn into_draft_with_document(
        self,
        document: Option<DocumentUpload>,
    ) -> PatientResult<(PatientDraft, DocumentUpload)> {
        let mut errors = Vec::new();
        self.require_all(&mut errors);
        require(&mut errors, FIELD_DOCUMENT_PHOTO, document.is_some());
        let fields = self.check_fields(&mut errors);
        let draft = draft_from(fields, errors)?;
        match document {
            Some(document) => Ok((draft, document)),
            None => Err(PatientError::Validation(vec![FieldError::new(
                FIELD_DOCUMENT_PHOTO,
                FIELD_REQUIRED,
            )])),
        }
    }

    /// Validates a partial update; only supplied fields are checked.
    pub fn into_patch(self) -> PatientResult<PatientPatch> {
        let mut errors = Vec::new();
        let patch = self.check_fields(&mut errors);
        if !errors.is_empty() {
            return Err(PatientError::Validation(errors));
        }
        Ok(patch)
    }
}

fn draft_from(fields: PatientPatch, errors: Vec<FieldError>) -> PatientResult<PatientDraft> {
    match (fields.full_name, fields.email, fields.phone_number) {
        (Some(full_name), Some(email), Some(phone_number)) if errors.is_empty() => {
            Ok(PatientDraft {
                full_name,
                email,
                phone_number,
            })
        }
        _ => Err(PatientError::Validation(errors)),
    }
}

/// Rejects a patch that would change nothing.
pub fn ensure_patch_not_empty(
    patch: &PatientPatch,
    document: Option<&DocumentUpload>,
) -> PatientResult<()> {
    if patch.is_empty() && document.is_none() {
        return Err(PatientError::InvalidPayload(EMPTY_PATCH.into()));
    }
    Ok(())
}

/// Validated pagination parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    size: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    /// `page` must be at least 1; `size` must be within `1..=MAX_PAGE_SIZE`.
    pub fn new(page: u32, size: u32) -> PatientResult<Self> {
        let mut errors = Vec::new();
        if page < 1 {
            errors.push(FieldError::new("page", "Input should be greater than or equal to 1"));
        }
        if size < 1 {
            errors.push(FieldError::new("size", "Input should be greater than or equal to 1"));
        } else if size > MAX_PAGE_SIZE {
            errors.push(FieldError::new(
                "size",
                format!("Input should be less than or equal to {MAX_PAGE_SIZE}"),
            ));
        }
        if !errors.is_empty() {
            return Err(PatientError::Validation(errors));
        }
        Ok(Self { page, size })
    }

    /// Parses raw query-string values, applying defaults for absent ones.
    pub fn from_query(page: Option<&str>, size: Option<&str>) -> PatientResult<Self> {
        let mut errors = Vec::new();
        let page = parse_page_param(&mut errors, "page", page, DEFAULT_PAGE);
        let size = parse_page_param(&mut errors, "size", size, DEFAULT_PAGE_SIZE);
        if !errors.is_empty() {
            return Err(PatientError::Validation(errors));
        }
        Self::new(page, size)
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.size)
    }
}

fn parse_page_param(
    errors: &mut Vec<FieldError>,
    field: &str,
    raw: Option<&str>,
    default: u32,
) -> u32 {
    let Some(raw) = raw.map(str::trim) else {
        return default;
    };
    match raw.parse::<i64>() {
        // Negative and zero values fall through to the range check in `PageRequest::new`.
        Ok(value) if value < 1 => 0,
        Ok(value) => u32::try_from(value).unwrap_or(u32::MAX),
        Err(_) => {
            errors.push(FieldError::new(
                field,
                "Input should be a valid integer, unable to parse string as an integer",
            ));
            default
        }
    }
}
