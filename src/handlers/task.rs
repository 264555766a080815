use actix_web::{HttpResponse, Responder, get, web};
use serde::Deserialize;

use crate::app_state::AppState;

#[derive(Deserialize)]
pub struct TaskQuery {
    pub task_id: String,
}

/// 查询任务状态：pending / done（附带报告）/ failed（附带错误信息）
#[get("/mesh/task")]
pub async fn get_task(data: web::Data<AppState>, query: web::Query<TaskQuery>) -> impl Responder {
    let Some(task) = data.task_store.get(&query.task_id) else {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "error": "无效的 task_id",
            "task_id": query.task_id,
        }));
    };

    HttpResponse::Ok().json(serde_json::json!({
        "task_id": query.task_id,
        "file": task.file,
        "shape": task.shape,
        "layout": task.config.layout,
        "state": task.state(),
        "remaining_labels": task.remaining_labels(),
    }))
}
