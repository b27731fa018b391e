//! Two-stage parser for generated draft text.
//!
//! 1. **Json**: the text between the first `{` and the last `}` must decode
//!    as an object holding `goals`, `issues` and `supports` string arrays.
//!    The arrays are returned unmodified.
//! 2. **Heuristic**: per section, a quoted array (`"goals": [ ... ]`) inside
//!    otherwise broken JSON, else list lines found under a section heading
//!    (plain or numbered). Text with no heading at all puts every list line
//!    in every section. A section that yields nothing gets numbered
//!    placeholders.
//!
//! If the heuristic stage finds no item in any section the parse fails.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use super::{DraftContent, DraftSection};

/// Cap on items taken from a line scan, per section.
pub const MAX_SCANNED_ITEMS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStage {
    Json,
    Heuristic,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDraft {
    pub content: DraftContent,
    pub stage: ParseStage,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DraftParseError {
    #[error("generated text is empty")]
    Empty,

    #[error("no goals, issues, or supports found in generated text")]
    NoItems,
}

#[derive(Deserialize)]
struct StrictDraft {
    goals: Vec<String>,
    issues: Vec<String>,
    supports: Vec<String>,
}

static QUOTED_ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""((?:[^"\\]|\\.)*)""#).expect("quoted item pattern is valid"));

static LIST_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[-*•]\s+|・\s*|\d+\s*[.)．）、]\s*)(.+)$").expect("list line pattern is valid")
});

/// `"<key>": [ ... ]` for each section, in [`DraftSection::ALL`] order.
static SECTION_ARRAY_RES: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    DraftSection::ALL.map(|section| {
        Regex::new(&format!(r#"(?s)"{}"\s*:\s*\[(.*?)\]"#, section.key()))
            .expect("section pattern is valid")
    })
});

fn heading_words(section: DraftSection) -> &'static [&'static str] {
    match section {
        DraftSection::Goals => &["goals", "goal", "目標"],
        DraftSection::Issues => &["issues", "issue", "問題点", "課題"],
        DraftSection::Supports => &["supports", "support", "支援内容", "支援"],
    }
}

/// Parse generated text into draft content.
pub fn parse_draft(text: &str) -> Result<ParsedDraft, DraftParseError> {
    if text.trim().is_empty() {
        return Err(DraftParseError::Empty);
    }

    if let Some(content) = parse_strict(text) {
        return Ok(ParsedDraft {
            content,
            stage: ParseStage::Json,
        });
    }

    parse_heuristic(text).map(|content| ParsedDraft {
        content,
        stage: ParseStage::Heuristic,
    })
}

fn parse_strict(text: &str) -> Option<DraftContent> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    let draft: StrictDraft = serde_json::from_str(&text[start..=end]).ok()?;
    Some(DraftContent {
        goals: draft.goals,
        issues: draft.issues,
        supports: draft.supports,
    })
}

fn parse_heuristic(text: &str) -> Result<DraftContent, DraftParseError> {
    let scanned = scan_lines(text);
    let mut content = DraftContent::default();
    let mut found_any = false;

    for (section, lines) in DraftSection::ALL.into_iter().zip(scanned) {
        let items = match quoted_array(text, section) {
            Some(items) => items,
            None => lines,
        };
        let target = content.section_mut(section);
        if items.is_empty() {
            *target = (1..=3).map(|n| format!("{}{n}", section.label())).collect();
        } else {
            found_any = true;
            *target = items;
        }
    }

    if found_any {
        Ok(content)
    } else {
        Err(DraftParseError::NoItems)
    }
}

/// Items of `"<key>": [ ... ]`, or `None` when absent or empty.
fn quoted_array(text: &str, section: DraftSection) -> Option<Vec<String>> {
    let slot = DraftSection::ALL.iter().position(|s| *s == section)?;
    let caps = SECTION_ARRAY_RES[slot].captures(text)?;
    let inner = caps.get(1)?.as_str();

    let quoted: Vec<String> = QUOTED_ITEM_RE
        .captures_iter(inner)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().replace("\\\"", "\"").trim().to_owned())
        .filter(|s| !s.is_empty())
        .collect();
    let items = if quoted.is_empty() {
        inner
            .split(',')
            .map(|s| s.trim().trim_matches('"').trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect()
    } else {
        quoted
    };

    (!items.is_empty()).then_some(items)
}

fn strip_heading_marks(line: &str) -> String {
    line.trim_start_matches(['#', '*', '【', '[', ' ', '　'])
        .trim_end_matches([':', '：', '*', '】', ']', ' ', '　'])
        .to_lowercase()
}

/// Detect a heading line naming one section.
fn heading_section(line: &str) -> Option<DraftSection> {
    let stripped = strip_heading_marks(line);
    if stripped.is_empty() || stripped.chars().count() > 16 {
        return None;
    }
    DraftSection::ALL
        .into_iter()
        .find(|s| heading_words(*s).iter().any(|w| stripped.contains(w)))
}

/// A numbered heading such as `1. 目標` or `2) Issues:`. Only the bare
/// heading word counts, so items like `1. 血圧の目標値を守る` stay items.
fn numbered_heading(item: &str) -> Option<DraftSection> {
    let stripped = strip_heading_marks(item);
    DraftSection::ALL
        .into_iter()
        .find(|s| heading_words(*s).contains(&stripped.as_str()))
}

fn clean_item(raw: &str) -> String {
    raw.trim()
        .trim_end_matches(',')
        .trim()
        .trim_matches('"')
        .trim()
        .to_owned()
}

fn push_capped(items: &mut Vec<String>, item: String) {
    if items.len() < MAX_SCANNED_ITEMS {
        items.push(item);
    }
}

/// List lines grouped by the heading they appear under, in
/// [`DraftSection::ALL`] order.
///
/// Lines before the first heading are dropped, unless the text has no
/// heading at all; then every list line belongs to every section.
fn scan_lines(text: &str) -> [Vec<String>; 3] {
    let mut out: [Vec<String>; 3] = Default::default();
    let mut unheaded: Vec<String> = Vec::new();
    let mut current: Option<usize> = None;
    let mut saw_heading = false;

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let listed = LIST_LINE_RE
            .captures(line)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str());

        let heading = match listed {
            Some(item) if line.starts_with(char::is_numeric) => numbered_heading(item),
            Some(_) => None,
            None => heading_section(line),
        };
        if let Some(section) = heading {
            current = DraftSection::ALL.iter().position(|s| *s == section);
            saw_heading = true;
            continue;
        }

        let Some(raw) = listed else { continue };
        let item = clean_item(raw);
        if item.is_empty() {
            continue;
        }
        match current {
            Some(slot) => push_capped(&mut out[slot], item),
            None if !saw_heading => push_capped(&mut unheaded, item),
            None => {}
        }
    }

    if !saw_heading {
        out = [unheaded.clone(), unheaded.clone(), unheaded];
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_formed_json_is_returned_unmodified() {
        let text = r#"以下が計画書です。
```json
{
  "goals": ["血圧を140/90未満に保つ", "転倒なく室内歩行できる", "服薬を自己管理できる", "入浴を安全に行う"],
  "issues": ["血圧変動", "転倒リスク", "服薬忘れ"],
  "supports": ["毎回のバイタル測定", "歩行訓練"]
}
```"#;
        let parsed = parse_draft(text).unwrap();
        assert_eq!(parsed.stage, ParseStage::Json);
        assert_eq!(parsed.content.goals.len(), 4);
        assert_eq!(parsed.content.goals[0], "血圧を140/90未満に保つ");
        assert_eq!(parsed.content.supports, vec!["毎回のバイタル測定", "歩行訓練"]);
    }

    #[test]
    fn broken_json_falls_back_to_quoted_arrays() {
        let text = r#"{
  "goals": ["血圧の安定", "ADLの維持"],
  "issues": ["高血圧", "転倒リスク"],
  "supports": ["血圧測定", "歩行訓練"],
"#;
        let parsed = parse_draft(text).unwrap();
        assert_eq!(parsed.stage, ParseStage::Heuristic);
        assert_eq!(parsed.content.goals, vec!["血圧の安定", "ADLの維持"]);
        assert_eq!(parsed.content.issues, vec!["高血圧", "転倒リスク"]);
        assert_eq!(parsed.content.supports, vec!["血圧測定", "歩行訓練"]);
    }

    #[test]
    fn missing_issue_bullets_get_placeholders() {
        let text = "## 目標\n- 血圧を安定させる\n- 転倒を防ぐ\n\n## 問題点\n特になし\n\n## 支援内容\n・服薬確認\n・バイタル測定\n";
        let parsed = parse_draft(text).unwrap();
        assert_eq!(parsed.stage, ParseStage::Heuristic);
        assert_eq!(parsed.content.goals, vec!["血圧を安定させる", "転倒を防ぐ"]);
        assert_eq!(parsed.content.issues, vec!["問題点1", "問題点2", "問題点3"]);
        assert_eq!(parsed.content.supports, vec!["服薬確認", "バイタル測定"]);
    }

    #[test]
    fn line_scan_caps_items_and_accepts_numbered_lines() {
        let text = "Goals:\n1. a\n2. b\n3) c\n4. d\n5. e\n6. f\nIssues:\n* x\nSupports:\n• y\n";
        let parsed = parse_draft(text).unwrap();
        assert_eq!(parsed.content.goals, vec!["a", "b", "c", "d", "e"]);
        assert_eq!(parsed.content.issues, vec!["x"]);
        assert_eq!(parsed.content.supports, vec!["y"]);
    }

    #[test]
    fn markdown_bold_headings_are_recognised() {
        let text = "**目標**\n- 自宅生活の継続\n**課題**\n- 介護負担\n**支援**\n- 家族指導\n";
        let parsed = parse_draft(text).unwrap();
        assert_eq!(parsed.content.goals, vec!["自宅生活の継続"]);
        assert_eq!(parsed.content.issues, vec!["介護負担"]);
        assert_eq!(parsed.content.supports, vec!["家族指導"]);
    }

    #[test]
    fn text_without_items_fails() {
        assert_eq!(
            parse_draft("申し訳ありませんが、作成できません。"),
            Err(DraftParseError::NoItems)
        );
        assert_eq!(parse_draft("  \n"), Err(DraftParseError::Empty));
    }

    #[test]
    fn numbered_headings_open_sections() {
        let text = "1. 目標\n- 血圧を安定させる\n- 転倒を防ぐ\n2. 問題点\n- 高血圧\n3. 支援内容\n- バイタル測定";
        let parsed = parse_draft(text).unwrap();
        assert_eq!(parsed.stage, ParseStage::Heuristic);
        assert_eq!(parsed.content.goals, vec!["血圧を安定させる", "転倒を防ぐ"]);
        assert_eq!(parsed.content.issues, vec!["高血圧"]);
        assert_eq!(parsed.content.supports, vec!["バイタル測定"]);
    }

    #[test]
    fn numbered_item_mentioning_a_heading_word_stays_an_item() {
        let text = "目標:\n1. 血圧の目標値を守る\n2. 転倒しない\n";
        let parsed = parse_draft(text).unwrap();
        assert_eq!(parsed.content.goals, vec!["血圧の目標値を守る", "転倒しない"]);
    }

    #[test]
    fn headingless_list_fills_every_section() {
        let text = "- 血圧測定\n- 歩行訓練\n";
        let parsed = parse_draft(text).unwrap();
        assert_eq!(parsed.content.goals, vec!["血圧測定", "歩行訓練"]);
        assert_eq!(parsed.content.issues, parsed.content.goals);
        assert_eq!(parsed.content.supports, parsed.content.goals);
    }

    #[test]
    fn list_lines_before_any_heading_are_ignored() {
        let text = "- stray\n目標:\n- kept\n";
        let parsed = parse_draft(text).unwrap();
        assert_eq!(parsed.content.goals, vec!["kept"]);
        assert_eq!(parsed.content.issues.len(), 3);
    }
}
