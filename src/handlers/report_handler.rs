use actix_web::{get, http::header, web, HttpResponse};

use crate::{
    app_state::AppState,
    auth::{can_view_attempt, require_same_organization, require_test_manager, AuthenticatedUser},
    errors::AppError,
    services::report_service::ReportService,
};

/// Downloadable PDF of one attempt's per-question results.
#[get("/attempts/{id}/report")]
pub async fn attempt_report(
    state: web::Data<AppState>,
    id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let attempt = state.attempt_service.get_attempt(&id).await?;

    can_view_attempt(&auth.0, &attempt.student_id)?;

    let test = state.test_service.get_test(&attempt.test_id).await?;
    require_same_organization(&auth.0, &test.organization_id)?;

    let bytes = ReportService::render_result_pdf(&test, &attempt)?;
    let filename = ReportService::result_filename(&test.name);

    Ok(pdf_response(bytes, &filename))
}

/// Downloadable answer-key summary of a test; authors and admins only.
#[get("/tests/{id}/summary")]
pub async fn test_summary(
    state: web::Data<AppState>,
    id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    require_test_manager(&auth.0)?;

    let test = state.test_service.get_test(&id).await?;
    require_same_organization(&auth.0, &test.organization_id)?;

    let bytes = ReportService::render_summary_pdf(&test)?;
    let filename = ReportService::summary_filename(&test.name);

    Ok(pdf_response(bytes, &filename))
}

fn pdf_response(bytes: Vec<u8>, filename: &str) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("application/pdf")
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        ))
        .body(bytes)
}
