//! 医学叙述文本规范化
//!
//! 供 TTS 使用：去掉朗读时的噪声字符和括号内容，把血压、单位等写法展开成可读的英文。

use std::sync::LazyLock;

use regex::{Captures, Regex};

static PARENTHESES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\([^)]*\)").expect("valid regex"));
static BLOOD_PRESSURE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)/(\d+)\s*mmHg").expect("valid regex"));
static UNIT_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"(\d+)\s*(mL|ml)", "${1} milliliters"),
        (r"(\d+)\s*(mmHg)", "${1} millimeters of mercury"),
        (r"(\d+)\s*μg/L", "${1} micrograms per liter"),
    ]
    .into_iter()
    .map(|(pattern, repl)| (Regex::new(pattern).expect("valid regex"), repl))
    .collect()
});
static SPACE_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" +").expect("valid regex"));
static NEWLINE_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n+").expect("valid regex"));
static NEWLINE_WITH_PADDING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\n\s*").expect("valid regex"));
static WHITESPACE_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

const NOISE_CHARS: [char; 3] = ['*', '-', '#'];
const SALUTATIONS: [&str; 2] = ["Dear [Patient’s Name],", "Dear [Patient's Name],"];
const REMOVED_PHRASES: [&str; 2] = ["AHA/ASA", "AHA"];

/// 文本规范化选项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextNormalizer {
    /// 将 ICH 展开为 intracerebral hemorrhage
    pub expand_acronyms: bool,
    /// 将换行规整为单个空格
    pub strip_newlines: bool,
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self {
            expand_acronyms: true,
            strip_newlines: false,
        }
    }
}

impl TextNormalizer {
    pub fn new(expand_acronyms: bool, strip_newlines: bool) -> Self {
        Self {
            expand_acronyms,
            strip_newlines,
        }
    }

    /// 规范化文本
    ///
    /// 各步骤重复执行直到文本不再变化，因此结果再次规范化不会改变。
    pub fn normalize(&self, text: &str) -> String {
        // 删除类规则只会缩短文本，展开结果不会被任何规则再次匹配，因此必然收敛
        let mut current = self.single_pass(text);
        loop {
            let next = self.single_pass(&current);
            if next == current {
                return current;
            }
            current = next;
        }
    }

    fn single_pass(&self, text: &str) -> String {
        let mut t: String = text.chars().filter(|c| !NOISE_CHARS.contains(c)).collect();
        for phrase in SALUTATIONS.iter().chain(REMOVED_PHRASES.iter()) {
            t = t.replace(phrase, "");
        }
        t = PARENTHESES.replace_all(&t, "").into_owned();
        t = convert_medical_units(&t);
        if self.expand_acronyms {
            t = t.replace("ICH", "intracerebral hemorrhage");
        }
        t = SPACE_RUNS.replace_all(&t, " ").trim().to_string();
        t = NEWLINE_RUNS.replace_all(&t, "\n").into_owned();
        if self.strip_newlines {
            t = strip_newlines(&t);
        }
        t
    }
}

/// 默认选项下的清洗
pub fn clean_text(text: &str) -> String {
    TextNormalizer::default().normalize(text)
}

/// 展开血压及常见医学单位
pub fn convert_medical_units(text: &str) -> String {
    let mut t = BLOOD_PRESSURE
        .replace_all(text, |caps: &Captures| {
            format!(
                "a systolic blood pressure of {} millimeters of mercury \
                 and a diastolic blood pressure of {} millimeters of mercury",
                &caps[1], &caps[2]
            )
        })
        .into_owned();
    for (pattern, repl) in UNIT_PATTERNS.iter() {
        t = pattern.replace_all(&t, *repl).into_owned();
    }
    t
}

/// 把换行及其两侧空白替换为单个空格
pub fn strip_newlines(text: &str) -> String {
    let t = NEWLINE_WITH_PADDING.replace_all(text, " ");
    WHITESPACE_RUNS.replace_all(&t, " ").trim().to_string()
}
