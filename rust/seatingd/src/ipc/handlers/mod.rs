pub mod backup;
pub mod classes;
pub mod core;
pub mod imports;
pub mod seating;
pub mod students;

use crate::ipc::error::ok;
use crate::ipc::helpers::HandlerErr;
use crate::ipc::types::Request;

fn respond(req: &Request, result: Result<serde_json::Value, HandlerErr>) -> serde_json::Value {
    match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    }
}
