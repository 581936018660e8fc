//! # Redis
//!
//! RAM database holding the course catalog, enrollments and sessions.
//!
//! ## Requirements
//!
//! - Fast lookups by ID on every lesson view
//! - Enrollment lookups scoped to one user and one course
//! - No decision caching, every read goes to Redis
//!
//! ## Implementation
//!
//! - Redis hashes of ID to JSON for courses, modules, lessons and sessions
//! - One set of lesson IDs per module
//! - One hash per (user, course) pair holding that pair's enrollments, status is filtered here
//! - Layout lives in [`catalog::keys`] so the seed tool writes the same shape
use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use catalog::{
    keys,
    models::{Course, Enrollment, Lesson, Module, PopulatedLesson, PopulatedModule, User},
};
use redis::{
    AsyncCommands, Client, RedisError,
    aio::{ConnectionManager, ConnectionManagerConfig},
};
use serde::de::DeserializeOwned;

use crate::store::{
    ContentStore, EnrollmentFilter, EnrollmentStore, SessionStore, StoreResult, module_listing,
};

pub async fn init_redis(redis_url: &str) -> Result<ConnectionManager, RedisError> {
    let config = ConnectionManagerConfig::new()
        .set_number_of_retries(1)
        .set_connection_timeout(Duration::from_millis(100));

    let client = Client::open(redis_url)?;
    client.get_connection_manager_with_config(config).await
}

#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
}

impl RedisStore {
    pub fn new(connection: ConnectionManager) -> Self {
        Self { connection }
    }

    async fn get_json<T>(&self, key: &str, field: &str) -> StoreResult<Option<T>>
    where
        T: DeserializeOwned + Send,
    {
        let mut connection = self.connection.clone();
        let raw: Option<String> = connection.hget(key, field).await?;

        Ok(raw.map(|raw| serde_json::from_str(&raw)).transpose()?)
    }

    async fn populate_module(&self, module: Module) -> StoreResult<PopulatedModule> {
        let course: Option<Course> = self.get_json(keys::COURSES, &module.course).await?;

        Ok(PopulatedModule {
            id: module.id,
            title: module.title,
            course,
        })
    }

    async fn populate(&self, lesson: Lesson) -> StoreResult<PopulatedLesson> {
        let module = match self.get_json::<Module>(keys::MODULES, &lesson.module).await? {
            Some(module) => Some(self.populate_module(module).await?),
            None => None,
        };

        Ok(PopulatedLesson { lesson, module })
    }
}

#[async_trait]
impl ContentStore for RedisStore {
    async fn find_lesson(&self, lesson_id: &str) -> StoreResult<Option<PopulatedLesson>> {
        match self.get_json::<Lesson>(keys::LESSONS, lesson_id).await? {
            Some(lesson) => Ok(Some(self.populate(lesson).await?)),
            None => Ok(None),
        }
    }

    async fn find_module(&self, module_id: &str) -> StoreResult<Option<PopulatedModule>> {
        match self.get_json::<Module>(keys::MODULES, module_id).await? {
            Some(module) => Ok(Some(self.populate_module(module).await?)),
            None => Ok(None),
        }
    }

    async fn lessons_in_module(&self, module_id: &str) -> StoreResult<Vec<PopulatedLesson>> {
        let mut connection = self.connection.clone();
        let lesson_ids: Vec<String> = connection.smembers(keys::module_lessons(module_id)).await?;

        let mut lessons = Vec::with_capacity(lesson_ids.len());
        for lesson_id in lesson_ids {
            // set may briefly point at a lesson that was removed
            if let Some(lesson) = self.find_lesson(&lesson_id).await? {
                lessons.push(lesson);
            }
        }

        Ok(module_listing(lessons, module_id))
    }
}

#[async_trait]
impl EnrollmentStore for RedisStore {
    async fn find_enrollments(&self, filter: &EnrollmentFilter) -> StoreResult<Vec<Enrollment>> {
        let mut connection = self.connection.clone();
        let raw: HashMap<String, String> = connection
            .hgetall(keys::enrollments(&filter.user_id, &filter.course_id))
            .await?;

        let mut enrollments = Vec::new();
        for value in raw.values() {
            let enrollment: Enrollment = serde_json::from_str(value)?;

            if filter.matches(&enrollment) {
                enrollments.push(enrollment);
            }
        }

        Ok(enrollments)
    }
}

#[async_trait]
impl SessionStore for RedisStore {
    async fn user_for_token(&self, token: &str) -> StoreResult<Option<User>> {
        self.get_json(keys::SESSIONS, token).await
    }
}
