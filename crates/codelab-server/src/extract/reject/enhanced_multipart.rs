//! Multipart extractor for document uploads.

use axum::extract::multipart::MultipartRejection;
use axum::extract::{FromRequest, Multipart as AxumMultipart, Request};
use derive_more::{Deref, DerefMut};

use crate::handler::{Error, ErrorKind};

/// Multipart form whose rejection renders as an [`ErrorResponse`].
///
/// [`ErrorResponse`]: crate::handler::ErrorResponse
#[must_use]
#[derive(Debug, Deref, DerefMut)]
pub struct Multipart(pub AxumMultipart);

impl<S> FromRequest<S> for Multipart
where
    S: Send + Sync,
{
    type Rejection = Error<'static>;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match AxumMultipart::from_request(req, state).await {
            Ok(multipart) => Ok(Self(multipart)),
            Err(rejection) => Err(rejection.into()),
        }
    }
}

impl From<MultipartRejection> for Error<'static> {
    fn from(rejection: MultipartRejection) -> Self {
        let error = ErrorKind::BadRequest.with_resource("upload");
        match rejection {
            MultipartRejection::InvalidBoundary(_) => error
                .with_message("Expected a multipart/form-data upload")
                .with_context("Send the document as the 'file' field of a multipart form."),
            other => error
                .with_message("Malformed multipart upload")
                .with_context(other.body_text()),
        }
    }
}

impl aide::OperationInput for Multipart {
    fn operation_input(
        ctx: &mut aide::generate::GenContext,
        operation: &mut aide::openapi::Operation,
    ) {
        AxumMultipart::operation_input(ctx, operation);
    }
}
