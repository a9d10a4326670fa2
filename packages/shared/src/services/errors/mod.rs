pub mod question_service_errors;
