//! Extractors whose rejections use the JSON error envelope instead of axum's plain-text bodies.

use axum::extract::{FromRequest, FromRequestParts};
use serde::Deserialize;
use wayfare_shared::PageRequest;

use crate::error::AppError;

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl PageParams {
    pub fn resolve(&self, default_limit: u32, max_limit: u32) -> PageRequest {
        PageRequest::new(self.page, self.limit, default_limit, max_limit)
    }
}
