//! `lectern search` — Query the index directly.

use lectern_config::AppConfig;
use lectern_index::SearchFilter;

use crate::runtime;

pub async fn run(
    config: &AppConfig,
    query: &str,
    course: Option<&str>,
    lesson: Option<u32>,
    limit: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let index = runtime::open_index(config)?;

    let mut filter = SearchFilter::default();
    if let Some(name) = course {
        match index.resolve_course_title(name).await? {
            Some(title) => filter.course_title = Some(title),
            None => {
                println!("No course found matching '{name}'");
                return Ok(());
            }
        }
    }
    filter.lesson_number = lesson;

    let limit = limit.unwrap_or(config.index.max_search_results);
    let results = index.search(query, &filter, limit).await?;
    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, hit) in results.hits().iter().enumerate() {
        println!("{}. [{}] distance {:.3}", i + 1, hit.chunk.label(), hit.distance);
        if let Some(link) = &hit.link {
            println!("   {link}");
        }
        println!("   {}", hit.to_source().excerpt.replace('\n', " "));
        println!();
    }
    Ok(())
}
