use anyhow::Result;
use console::style;
use std::path::Path;

use crate::cli::OutputFormat;
use crate::writer::PlatformResult;

/// Save generated posts to file
pub async fn save_to_file(results: &[PlatformResult], path: &Path, format: &OutputFormat) -> Result<()> {
    let content = render(results, format)?;
    fs_err::write(path, content)?;
    Ok(())
}

/// Print generated posts to console
pub fn print_to_console(results: &[PlatformResult], format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => print_styled(results),
        _ => println!("{}", render(results, format)?),
    }
    Ok(())
}

pub fn render(results: &[PlatformResult], format: &OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Text => format_as_text(results),
        OutputFormat::Markdown => format_as_markdown(results),
        OutputFormat::Json => format_as_json(results)?,
    })
}

pub fn format_as_text(results: &[PlatformResult]) -> String {
    results
        .iter()
        .map(|result| format!("== {} ==\n{}\n", result.platform, result.content.trim_end()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Same layout as the web form's result page
pub fn format_as_markdown(results: &[PlatformResult]) -> String {
    let mut out = String::from("### Output by Platform:\n");
    for result in results {
        out.push_str(&format!(
            "\n## {platform}\n\n**Platform:** {platform}\n\n**Content:** {content}\n\n```markdown\n{content}\n```\n",
            platform = result.platform,
            content = result.content.trim_end(),
        ));
    }
    out
}

pub fn format_as_json(results: &[PlatformResult]) -> Result<String> {
    Ok(serde_json::to_string_pretty(results)?)
}

fn print_styled(results: &[PlatformResult]) {
    for (index, result) in results.iter().enumerate() {
        if index > 0 {
            println!();
        }
        println!("{}", style(&result.platform).bold().cyan());
        println!("{}", result.content.trim_end());
    }
}
