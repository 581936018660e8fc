//! # Catalog Seeding
//!
//! Writes a catalog fixture into Redis in the layout the server reads.
//!
//! ## Order
//!
//! 1. Courses, then modules, then lessons, so references resolve as soon as a lesson lands.
//! 2. Each lesson is also added to its module's lesson set, and removed from the set of
//!    the module it was stored under before, if that changed.
//! 3. Enrollments go into the hash of their (user, course) pair.
//! 4. Sessions last.
//!
//! Re-running with the same fixture overwrites records in place. Records removed from the
//! fixture are left in Redis.
use std::path::Path;

use anyhow::{Context, Error};
use catalog::{
    keys,
    models::{Catalog, Enrollment, Lesson},
    read_catalog,
};
use indicatif::{ProgressBar, ProgressStyle};
use redis::{AsyncCommands, Client, aio::MultiplexedConnection};
use serde::Serialize;

pub async fn seed_catalog(path: &Path, redis_url: &str) -> Result<(), Error> {
    let catalog = read_catalog(path)?;

    println!("Loaded Courses: {}", catalog.courses.len());
    println!("Loaded Modules: {}", catalog.modules.len());
    println!("Loaded Lessons: {}", catalog.lessons.len());
    println!("Loaded Enrollments: {}", catalog.enrollments.len());
    println!("Loaded Sessions: {}\n", catalog.sessions.len());

    let client = Client::open(redis_url).context("Invalid Redis URL")?;
    let mut connection = client
        .get_multiplexed_async_connection()
        .await
        .context("Failed to connect to Redis")?;

    write_catalog(&mut connection, &catalog).await?;

    println!("Seeded {} records", record_count(&catalog));

    Ok(())
}

fn record_count(catalog: &Catalog) -> usize {
    catalog.courses.len()
        + catalog.modules.len()
        + catalog.lessons.len()
        + catalog.enrollments.len()
        + catalog.sessions.len()
}

async fn write_catalog(connection: &mut MultiplexedConnection, catalog: &Catalog) -> Result<(), Error> {
    let pb = ProgressBar::new(record_count(catalog) as u64);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
        )?
        .progress_chars("=> "),
    );

    pb.set_message("Courses");
    for course in &catalog.courses {
        put_json(connection, keys::COURSES, &course.id, course).await?;
        pb.inc(1);
    }

    pb.set_message("Modules");
    for module in &catalog.modules {
        put_json(connection, keys::MODULES, &module.id, module).await?;
        pb.inc(1);
    }

    pb.set_message("Lessons");
    for lesson in &catalog.lessons {
        write_lesson(connection, lesson).await?;
        pb.inc(1);
    }

    pb.set_message("Enrollments");
    for enrollment in &catalog.enrollments {
        write_enrollment(connection, enrollment).await?;
        pb.inc(1);
    }

    pb.set_message("Sessions");
    for session in &catalog.sessions {
        put_json(connection, keys::SESSIONS, &session.token, &session.user).await?;
        pb.inc(1);
    }

    pb.finish_with_message("Done");

    Ok(())
}

async fn write_lesson(connection: &mut MultiplexedConnection, lesson: &Lesson) -> Result<(), Error> {
    let stored: Option<String> = connection
        .hget(keys::LESSONS, &lesson.id)
        .await
        .with_context(|| format!("Failed to read lesson {}", lesson.id))?;

    if let Some(old_module) = moved_from(stored.as_deref(), lesson) {
        let _: () = connection
            .srem(keys::module_lessons(&old_module), &lesson.id)
            .await
            .with_context(|| format!("Failed to unindex lesson {}", lesson.id))?;
    }

    put_json(connection, keys::LESSONS, &lesson.id, lesson).await?;

    let _: () = connection
        .sadd(keys::module_lessons(&lesson.module), &lesson.id)
        .await
        .with_context(|| format!("Failed to index lesson {}", lesson.id))?;

    Ok(())
}

/// Module the stored copy of `lesson` belongs to, when it differs from the new one.
///
/// A stored copy that no longer parses is overwritten without cleanup.
fn moved_from(stored: Option<&str>, lesson: &Lesson) -> Option<String> {
    let previous: Lesson = serde_json::from_str(stored?).ok()?;

    (previous.module != lesson.module).then_some(previous.module)
}

async fn write_enrollment(
    connection: &mut MultiplexedConnection,
    enrollment: &Enrollment,
) -> Result<(), Error> {
    let key = keys::enrollments(&enrollment.user, &enrollment.course);

    put_json(connection, &key, &enrollment.id, enrollment).await
}

async fn put_json<T: Serialize>(
    connection: &mut MultiplexedConnection,
    key: &str,
    field: &str,
    value: &T,
) -> Result<(), Error> {
    let json = serde_json::to_string(value)?;

    let _: () = connection
        .hset(key, field, json)
        .await
        .with_context(|| format!("Failed to write {key} {field}"))?;

    Ok(())
}
