//! In-memory store (for tests and local runs)

use std::{collections::HashMap, sync::RwLock};

use async_trait::async_trait;
use catalog::models::{
    Catalog, Course, Enrollment, Lesson, Module, PopulatedLesson, PopulatedModule, User,
};

use crate::store::{
    ContentStore, EnrollmentFilter, EnrollmentStore, SessionStore, StoreResult, module_listing,
};

#[derive(Default)]
struct Records {
    courses: HashMap<String, Course>,
    modules: HashMap<String, Module>,
    lessons: HashMap<String, Lesson>,
    enrollments: Vec<Enrollment>,
    sessions: HashMap<String, User>,
}

impl Records {
    fn populate_module(&self, module: &Module) -> PopulatedModule {
        PopulatedModule {
            id: module.id.clone(),
            title: module.title.clone(),
            course: self.courses.get(&module.course).cloned(),
        }
    }

    fn populate(&self, lesson: &Lesson) -> PopulatedLesson {
        PopulatedLesson {
            lesson: lesson.clone(),
            module: self
                .modules
                .get(&lesson.module)
                .map(|module| self.populate_module(module)),
        }
    }
}

/// Thread-safe via `RwLock`. Not persistent, data is lost on drop.
#[derive(Default)]
pub struct InMemoryStore {
    records: RwLock<Records>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_catalog(catalog: Catalog) -> Self {
        let store = Self::new();

        for course in catalog.courses {
            store.insert_course(course);
        }
        for module in catalog.modules {
            store.insert_module(module);
        }
        for lesson in catalog.lessons {
            store.insert_lesson(lesson);
        }
        for enrollment in catalog.enrollments {
            store.insert_enrollment(enrollment);
        }
        for session in catalog.sessions {
            store.insert_session(&session.token, session.user);
        }

        store
    }

    pub fn insert_course(&self, course: Course) {
        self.records
            .write()
            .unwrap()
            .courses
            .insert(course.id.clone(), course);
    }

    pub fn insert_module(&self, module: Module) {
        self.records
            .write()
            .unwrap()
            .modules
            .insert(module.id.clone(), module);
    }

    pub fn insert_lesson(&self, lesson: Lesson) {
        self.records
            .write()
            .unwrap()
            .lessons
            .insert(lesson.id.clone(), lesson);
    }

    /// Replaces an enrollment with the same ID.
    pub fn insert_enrollment(&self, enrollment: Enrollment) {
        let mut records = self.records.write().unwrap();

        records.enrollments.retain(|existing| existing.id != enrollment.id);
        records.enrollments.push(enrollment);
    }

    pub fn insert_session(&self, token: &str, user: User) {
        self.records
            .write()
            .unwrap()
            .sessions
            .insert(token.to_string(), user);
    }
}

#[async_trait]
impl ContentStore for InMemoryStore {
    async fn find_lesson(&self, lesson_id: &str) -> StoreResult<Option<PopulatedLesson>> {
        let records = self.records.read().unwrap();

        Ok(records
            .lessons
            .get(lesson_id)
            .map(|lesson| records.populate(lesson)))
    }

    async fn find_module(&self, module_id: &str) -> StoreResult<Option<PopulatedModule>> {
        let records = self.records.read().unwrap();

        Ok(records
            .modules
            .get(module_id)
            .map(|module| records.populate_module(module)))
    }

    async fn lessons_in_module(&self, module_id: &str) -> StoreResult<Vec<PopulatedLesson>> {
        let records = self.records.read().unwrap();

        let lessons = records
            .lessons
            .values()
            .map(|lesson| records.populate(lesson));

        Ok(module_listing(lessons, module_id))
    }
}

#[async_trait]
impl EnrollmentStore for InMemoryStore {
    async fn find_enrollments(&self, filter: &EnrollmentFilter) -> StoreResult<Vec<Enrollment>> {
        Ok(self
            .records
            .read()
            .unwrap()
            .enrollments
            .iter()
            .filter(|enrollment| filter.matches(enrollment))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl SessionStore for InMemoryStore {
    async fn user_for_token(&self, token: &str) -> StoreResult<Option<User>> {
        Ok(self.records.read().unwrap().sessions.get(token).cloned())
    }
}
