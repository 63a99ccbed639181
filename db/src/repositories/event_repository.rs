use crate::models::event::{Entity, Model};
use sea_orm::{DatabaseConnection, DbErr, EntityTrait};

#[derive(Clone)]
pub struct EventRepository {
    db: DatabaseConnection,
}

impl EventRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Model>, DbErr> {
        Entity::find_by_id(id).one(&self.db).await
    }
}
