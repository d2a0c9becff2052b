use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

static DUE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"due:(\S+)\s*").expect("static regex"));
static ASSIGNEE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@(\d+)\s*").expect("static regex"));
static SPACES_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("static regex"));

#[derive(Debug, PartialEq)]
pub struct ParsedTask {
    pub title: String,
    pub due_date: Option<NaiveDate>,
    pub assignee: Option<u64>,
}

/// Splits quick-add input like `Write docs due:2025-03-01 @7` into a title,
/// a due date and an assignee id. The first valid token of each kind wins;
/// every token is removed from the title.
pub fn parse_task_input(input: &str) -> ParsedTask {
    let mut due_date = None;

    // Due date
    for caps in DUE_RE.captures_iter(input) {
        if let Some(date_match) = caps.get(1) {
            if let Ok(date) = NaiveDate::parse_from_str(date_match.as_str(), "%Y-%m-%d") {
                if due_date.is_none() {
                    due_date = Some(date);
                }
            }
        }
    }

    // Assignee
    let assignee = ASSIGNEE_RE
        .captures_iter(input)
        .filter_map(|caps| caps.get(1)?.as_str().parse::<u64>().ok())
        .next();

    let title = DUE_RE.replace_all(input, "");
    let title = ASSIGNEE_RE.replace_all(&title, "");
    let title = SPACES_RE.replace_all(&title, " ").trim().to_string();

    ParsedTask {
        title,
        due_date,
        assignee,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn test_parse_plain_title() {
        let result = parse_task_input("  Update   software documentation ");
        let expected = ParsedTask {
            title: "Update software documentation".to_string(),
            due_date: None,
            assignee: None,
        };
        assert_eq!(result, expected);
    }

    #[test]
    fn test_parse_with_due_date_in_middle() {
        let input = "Fix bugs due:2025-03-01    in the code";
        let expected = ParsedTask {
            title: "Fix bugs in the code".to_string(),
            due_date: date(2025, 3, 1),
            assignee: None,
        };
        assert_eq!(parse_task_input(input), expected);
    }

    #[test]
    fn test_parse_with_assignee_and_due_date() {
        let input = "@7 Deploy to production due:2024-12-24";
        let expected = ParsedTask {
            title: "Deploy to production".to_string(),
            due_date: date(2024, 12, 24),
            assignee: Some(7),
        };
        assert_eq!(parse_task_input(input), expected);
    }

    #[test]
    fn test_parse_first_token_wins() {
        let input = "Plan event @3 @4 due:2025-01-02 due:2025-01-03";
        let result = parse_task_input(input);
        assert_eq!(result.title, "Plan event");
        assert_eq!(result.assignee, Some(3));
        assert_eq!(result.due_date, date(2025, 1, 2));
    }

    #[test]
    fn test_parse_with_invalid_due_date() {
        let input = "Check logs due:2025-13-40    immediately";
        let expected = ParsedTask {
            title: "Check logs immediately".to_string(),
            due_date: None,
            assignee: None,
        };
        assert_eq!(parse_task_input(input), expected);
    }
}
