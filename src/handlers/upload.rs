use crate::models::errors::{AppError, ValidationError};
use crate::models::upload::{IncomingFile, UploadResponse};
use crate::services::file_storage::StagedFile;
use crate::services::validation::validate_declared;
use crate::AppState;
use axum::{
    body::Body,
    extract::{Request, State},
    http::header,
    response::Json,
};
use futures_util::TryStreamExt;
use multer::{Constraints, Multipart, SizeLimit};

/// Form field that must carry the image.
pub const UPLOAD_FIELD: &str = "image";

/// Allowance for multipart framing and ordinary text fields on top of the file.
const FORM_OVERHEAD_BYTES: u64 = 1024 * 1024;

/// Accept one image, stage it, relay it to Google Drive and clean up.
pub async fn upload_image(
    State(app_state): State<AppState>,
    request: Request<Body>,
) -> Result<Json<UploadResponse>, AppError> {
    let max_file_size = app_state.config.max_file_size;
    let limit_mb = max_file_size.div_ceil(1024 * 1024);

    let boundary = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|ct| ct.to_str().ok())
        .and_then(|ct| multer::parse_boundary(ct).ok())
        .ok_or_else(|| ValidationError::Malformed {
            message: "Missing or invalid multipart boundary".to_string(),
        })?;

    // Convert the request body to a stream
    let stream = request
        .into_body()
        .into_data_stream()
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err));

    let constraints = Constraints::new()
        .size_limit(SizeLimit::new().whole_stream(max_file_size as u64 + FORM_OVERHEAD_BYTES));
    let mut multipart = Multipart::with_constraints(stream, boundary, constraints);
    let mut staged: Option<(StagedFile, IncomingFile)> = None;

    let intake = async {
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| multipart_error(e, limit_mb))?
        {
            let field_name = field.name().unwrap_or_default().to_string();
            let original_name = match field.file_name() {
                Some(name) if !name.is_empty() => name.to_string(),
                // Text fields and empty file inputs carry no upload
                _ => continue,
            };

            if staged.is_some() {
                return Err(ValidationError::TooManyFiles.into());
            }
            if field_name != UPLOAD_FIELD {
                return Err(ValidationError::UnexpectedField { field: field_name }.into());
            }

            let content_type = field.content_type().map(|m| m.to_string());
            validate_declared(content_type.as_deref())?;

            tracing::info!(
                "Received file: {} (content_type: {:?})",
                original_name,
                content_type
            );

            let incoming = IncomingFile {
                field_name,
                original_name,
                content_type: content_type.unwrap_or_default(),
            };

            let file = app_state
                .storage
                .stage(
                    &incoming.field_name,
                    &incoming.original_name,
                    field.map_err(|e| multipart_error(e, limit_mb)),
                    max_file_size,
                )
                .await?;
            staged = Some((file, incoming));
        }

        Ok::<(), AppError>(())
    }
    .await;

    if let Err(e) = intake {
        if let Some((file, _)) = staged {
            file.remove().await;
        }
        return Err(e);
    }

    let (file, incoming) = staged.ok_or(ValidationError::NoFile)?;

    let result = app_state
        .uploader
        .upload(file.path(), &incoming.original_name, &incoming.content_type)
        .await;
    file.remove().await;
    let result = result?;

    tracing::info!(
        "Uploaded {} to Google Drive (id: {})",
        result.name,
        result.id
    );

    Ok(Json(UploadResponse::from(result)))
}

fn multipart_error(error: multer::Error, limit_mb: usize) -> AppError {
    match error {
        multer::Error::FieldSizeExceeded { .. } | multer::Error::StreamSizeExceeded { .. } => {
            ValidationError::TooLarge { limit_mb }.into()
        }
        other => {
            tracing::error!("Failed to read multipart field: {}", other);
            ValidationError::Malformed {
                message: other.to_string(),
            }
            .into()
        }
    }
}
