use anyhow::Result;
use axum::{http::StatusCode, response::IntoResponse};
use http_body_util::BodyExt;

use rideplus_api::error::{classify, classify_error, has_trait, ErrorKind, ErrorTrait};

#[derive(Debug, thiserror::Error)]
#[error("trip lookup failed")]
struct TripLookupFailed(#[source] rideplus_api::AppError);

#[test]
fn documented_classifications() {
    let not_found = classify(ErrorKind::ResourceNotFound);
    assert_eq!((not_found.status, not_found.error_trait), (StatusCode::NOT_FOUND, None));

    let access = classify(ErrorKind::AccessError);
    assert_eq!(
        (access.status, access.error_trait),
        (StatusCode::FORBIDDEN, Some(ErrorTrait::AccessDenied))
    );
}

#[test]
fn classification_survives_wrapping_and_foreign_layers() {
    let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "db timeout");
    let err = ErrorKind::NoRecordFound
        .wrap(io, "trip not found")
        .decorate("loading trip")
        .with_context("trip_id", 42);
    assert_eq!(err.classification(), classify(ErrorKind::NoRecordFound));

    let inner = ErrorKind::AccessError
        .error("not your trip")
        .decorate("checking owner");
    let outer = TripLookupFailed(inner);
    assert_eq!(classify_error(&outer).status, StatusCode::FORBIDDEN);
    assert!(has_trait(&outer, ErrorTrait::AccessDenied));
    assert!(!has_trait(&outer, ErrorTrait::Ineligible));
}

#[tokio::test]
async fn boundary_hides_details_behind_trait_message() -> Result<()> {
    let response = ErrorKind::AccessError
        .error("user 7 is not a member of company 9")
        .into_response();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let bytes = response.into_body().collect().await?.to_bytes();
    let body: serde_json::Value = serde_json::from_slice(&bytes)?;
    assert_eq!(body["error"], true);
    assert_eq!(body["code"], 403);
    assert_eq!(body["message"], ErrorTrait::AccessDenied.message());
    Ok(())
}
