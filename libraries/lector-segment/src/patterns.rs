//! Heading patterns

use once_cell::sync::Lazy;
use regex::Regex;

const SPELLED: &str = "(?:twenty|thirty|forty|fifty|sixty|seventy|eighty|ninety)(?:-(?:one|two|three|four|five|six|seven|eight|nine))?\
|one|two|three|four|five|six|seven|eight|nine|ten|eleven|twelve|thirteen|fourteen|fifteen|sixteen|seventeen|eighteen|nineteen";

/// `Chapter 12`, `PART IV: The Return`, `Book One - Origins`
pub static NUMBERED_HEADING: Lazy<Regex> = Lazy::new(|| {
    let pattern = format!(
        r"(?mi)^[ \t]*(?:chapter|part|book)[ \t]+(?:[0-9]+|[ivxlcdm]+|{SPELLED})\b(?:[ \t]*[:.\-][^\n]*)?[ \t]*\r?$"
    );
    Regex::new(&pattern).expect("numbered heading pattern is valid")
});

/// `# Title` through `### Title`
pub static MARKDOWN_HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*#{1,3}[ \t]+\S[^\n]*$").expect("markdown heading pattern is valid")
});

/// `第十二章`, `第3回 ...`, `第一节`
pub static CJK_HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t\u{3000}]*第[0-9０-９一二三四五六七八九十百千零〇两]+[章回节][^\n]*$")
        .expect("CJK heading pattern is valid")
});
