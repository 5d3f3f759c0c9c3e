//! Class business logic - lookups and creation of class definitions.

use crate::{
    config::app::ClassSeed,
    entities::{Class, ClassType, class},
    errors::{Error, Result},
};
use sea_orm::{Set, prelude::*};
use tracing::info;

/// Input for [`create_class`].
#[derive(Debug, Clone)]
pub struct NewClass {
    pub id: Option<String>,
    pub class_type: ClassType,
    pub title: String,
    pub start_time: Option<DateTimeUtc>,
    pub end_time: Option<DateTimeUtc>,
    pub recurrence_rule: Option<String>,
    pub capacity: Option<i32>,
    pub coach_ids: Option<Json>,
    pub branch_id: Option<String>,
    pub is_active: bool,
}

/// Finds a class by id, active or not.
pub async fn get_class_by_id(db: &DatabaseConnection, class_id: &str) -> Result<Option<class::Model>> {
    Class::find_by_id(class_id.to_string())
        .one(db)
        .await
        .map_err(Into::into)
}

/// Loads every class whose id is in `class_ids`. Unknown ids are skipped.
pub async fn list_classes_by_ids(
    db: &DatabaseConnection,
    class_ids: &[String],
) -> Result<Vec<class::Model>> {
    if class_ids.is_empty() {
        return Ok(Vec::new());
    }
    Class::find()
        .filter(class::Column::Id.is_in(class_ids.iter().cloned()))
        .all(db)
        .await
        .map_err(Into::into)
}

/// Creates a class after validating its title.
pub async fn create_class(db: &DatabaseConnection, input: NewClass) -> Result<class::Model> {
    if input.title.trim().is_empty() {
        return Err(Error::invalid_input("Class title cannot be empty"));
    }

    let now = chrono::Utc::now();
    let class = class::ActiveModel {
        id: Set(input.id.unwrap_or_else(super::new_id)),
        class_type: Set(input.class_type),
        title: Set(input.title.trim().to_string()),
        description: Set(None),
        capacity: Set(input.capacity),
        coach_ids: Set(input.coach_ids),
        branch_id: Set(input.branch_id),
        start_time: Set(input.start_time),
        end_time: Set(input.end_time),
        recurrence_rule: Set(input.recurrence_rule),
        is_active: Set(input.is_active),
        created_at: Set(now),
        updated_at: Set(now),
    };

    class.insert(db).await.map_err(Into::into)
}

/// Parses a class type name as written in configuration.
pub fn parse_class_type(value: &str) -> Result<ClassType> {
    match value.trim().to_ascii_uppercase().as_str() {
        "REGULAR" => Ok(ClassType::Regular),
        "CAMP" => Ok(ClassType::Camp),
        "PRIVATE" => Ok(ClassType::Private),
        "GROUP" => Ok(ClassType::Group),
        other => Err(Error::Config {
            message: format!("Unknown class type '{other}'"),
        }),
    }
}

/// Creates each configured class whose id is not already present.
///
/// Returns the number of classes inserted.
pub async fn seed_classes(db: &DatabaseConnection, seeds: &[ClassSeed]) -> Result<usize> {
    let mut created = 0;
    for seed in seeds {
        if get_class_by_id(db, &seed.id).await?.is_some() {
            continue;
        }
        let coach_ids = (!seed.coach_ids.is_empty()).then(|| Json::from(seed.coach_ids.clone()));
        create_class(
            db,
            NewClass {
                id: Some(seed.id.clone()),
                class_type: parse_class_type(&seed.class_type)?,
                title: seed.title.clone(),
                start_time: seed.start_time,
                end_time: seed.end_time,
                recurrence_rule: seed.recurrence_rule.clone(),
                capacity: seed.capacity,
                coach_ids,
                branch_id: seed.branch_id.clone(),
                is_active: true,
            },
        )
        .await?;
        created += 1;
    }
    if created > 0 {
        info!("Seeded {} classes from configuration.", created);
    }
    Ok(created)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_create_class_validation() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let mut input = weekly_class_input("c1", None);
        input.title = "   ".to_string();

        let result = create_class(&db, input).await;
        assert!(matches!(result.unwrap_err(), Error::InvalidInput { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_list_classes_by_ids_skips_unknown() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_class(&db, "swim").await?;
        create_test_class(&db, "judo").await?;

        let found =
            list_classes_by_ids(&db, &["swim".to_string(), "missing".to_string()]).await?;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "swim");

        assert!(list_classes_by_ids(&db, &[]).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_seed_classes_is_idempotent() -> Result<()> {
        let db = setup_test_db().await?;
        let seeds = vec![ClassSeed {
            id: "camp-summer".to_string(),
            title: "Summer Camp".to_string(),
            class_type: "camp".to_string(),
            start_time: None,
            end_time: None,
            recurrence_rule: None,
            capacity: Some(20),
            branch_id: None,
            coach_ids: vec!["coach-a".to_string()],
        }];

        assert_eq!(seed_classes(&db, &seeds).await?, 1);
        assert_eq!(seed_classes(&db, &seeds).await?, 0);

        let class = get_class_by_id(&db, "camp-summer").await?.unwrap();
        assert_eq!(class.class_type, ClassType::Camp);
        assert_eq!(class.coach_ids, Some(serde_json::json!(["coach-a"])));
        Ok(())
    }

    #[test]
    fn test_parse_class_type_rejects_unknown() {
        assert!(parse_class_type("yoga").is_err());
        assert_eq!(parse_class_type(" group ").unwrap(), ClassType::Group);
    }
}
