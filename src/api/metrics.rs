use actix_web::HttpResponse;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

static SUBMISSION_COUNT: AtomicU64 = AtomicU64::new(0);
static CONFLICT_COUNT: AtomicU64 = AtomicU64::new(0);
static BULK_ROW_COUNT: AtomicU64 = AtomicU64::new(0);
static ERROR_COUNT: AtomicU64 = AtomicU64::new(0);

pub fn increment_submission_count() {
    SUBMISSION_COUNT.fetch_add(1, Ordering::Relaxed);
}

pub fn increment_conflict_count() {
    CONFLICT_COUNT.fetch_add(1, Ordering::Relaxed);
}

pub fn increment_bulk_row_count() {
    BULK_ROW_COUNT.fetch_add(1, Ordering::Relaxed);
}

pub fn increment_error_count() {
    ERROR_COUNT.fetch_add(1, Ordering::Relaxed);
}

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct MetricsResponse {
    pub submissions_total: u64,
    pub submission_conflicts_total: u64,
    pub bulk_rows_processed_total: u64,
    pub http_errors_total: u64,
}

fn snapshot() -> MetricsResponse {
    MetricsResponse {
        submissions_total: SUBMISSION_COUNT.load(Ordering::Relaxed),
        submission_conflicts_total: CONFLICT_COUNT.load(Ordering::Relaxed),
        bulk_rows_processed_total: BULK_ROW_COUNT.load(Ordering::Relaxed),
        http_errors_total: ERROR_COUNT.load(Ordering::Relaxed),
    }
}

fn render(m: &MetricsResponse) -> String {
    format!(
        "# HELP submissions_total Successful material list saves\n\
         # TYPE submissions_total counter\n\
         submissions_total {}\n\
         \n\
         # HELP submission_conflicts_total Submissions rejected for cross-user conflicts\n\
         # TYPE submission_conflicts_total counter\n\
         submission_conflicts_total {}\n\
         \n\
         # HELP bulk_rows_processed_total Spreadsheet rows processed by bulk import\n\
         # TYPE bulk_rows_processed_total counter\n\
         bulk_rows_processed_total {}\n\
         \n\
         # HELP http_errors_total Total number of HTTP error responses\n\
         # TYPE http_errors_total counter\n\
         http_errors_total {}\n",
        m.submissions_total,
        m.submission_conflicts_total,
        m.bulk_rows_processed_total,
        m.http_errors_total
    )
}

#[utoipa::path(
    get,
    path = "/metrics",
    tag = "Health",
    responses(
        (status = 200, description = "Prometheus counters", body = String)
    )
)]
pub async fn get_metrics() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(render(&snapshot()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_lists_every_counter() {
        let text = render(&MetricsResponse {
            submissions_total: 3,
            submission_conflicts_total: 1,
            bulk_rows_processed_total: 0,
            http_errors_total: 2,
        });
        assert!(text.contains("submissions_total 3\n"));
        assert!(text.contains("submission_conflicts_total 1\n"));
        assert!(text.contains("http_errors_total 2\n"));
    }
}
