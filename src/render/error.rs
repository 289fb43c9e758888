// src/render/error.rs
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to render plot: {0}")]
    Plot(String),
    #[error("failed to write image: {0}")]
    Io(#[from] std::io::Error),
}

impl<E: std::error::Error + Send + Sync + 'static> From<plotters::drawing::DrawingAreaErrorKind<E>>
    for RenderError
{
    fn from(value: plotters::drawing::DrawingAreaErrorKind<E>) -> Self {
        RenderError::Plot(format!("{value:?}"))
    }
}

impl From<image::ImageError> for RenderError {
    fn from(value: image::ImageError) -> Self {
        RenderError::Plot(value.to_string())
    }
}
