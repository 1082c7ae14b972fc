//! `lectern courses` — List indexed courses.

use lectern_config::AppConfig;

use crate::runtime;

pub async fn run(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let index = runtime::open_index(config)?;
    let titles = index.course_titles().await;

    if titles.is_empty() {
        println!("No courses indexed. Run `lectern ingest <folder>` first.");
        return Ok(());
    }

    println!("{} courses:", titles.len());
    for title in &titles {
        let lessons = index.course(title).await.map_or(0, |c| c.lessons.len());
        println!("  {title} ({lessons} lessons)");
    }
    Ok(())
}
