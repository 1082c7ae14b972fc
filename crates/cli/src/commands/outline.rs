//! `lectern outline` — Show a course's lessons.

use lectern_config::AppConfig;
use lectern_tools::course_outline::format_outline;

use crate::runtime;

pub async fn run(config: &AppConfig, course: &str) -> Result<(), Box<dyn std::error::Error>> {
    let index = runtime::open_index(config)?;

    let found = match index.resolve_course_title(course).await? {
        Some(title) => index.course(&title).await,
        None => None,
    };
    match found {
        Some(course) => println!("{}", format_outline(&course)),
        None => println!("No course found matching '{course}'"),
    }
    Ok(())
}
