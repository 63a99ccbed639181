use crate::models::attendance_record::{ActiveModel, Column, Entity, Model};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder,
};

#[derive(Clone)]
pub struct AttendanceRecordRepository {
    db: DatabaseConnection,
}

impl AttendanceRecordRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create(&self, active_model: ActiveModel) -> Result<Model, DbErr> {
        active_model.insert(&self.db).await
    }

    pub async fn find_by_session(&self, session_id: &str) -> Result<Option<Model>, DbErr> {
        Entity::find()
            .filter(Column::SessionId.eq(session_id))
            .one(&self.db)
            .await
    }

    pub async fn list_for_event(&self, event_id: i64) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .filter(Column::EventId.eq(event_id))
            .order_by_asc(Column::CheckedInAt)
            .all(&self.db)
            .await
    }
}
