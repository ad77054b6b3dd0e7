//! Request extractors

use axum::extract::FromRequest;
use folio_common::errors::AppError;

/// `Json` whose rejections render as a 400 with the standard error body
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);
