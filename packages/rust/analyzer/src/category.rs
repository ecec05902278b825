//! Rule-based category inference.

/// Category used when no rule matches.
pub const DEFAULT_CATEGORY: &str = "default";

/// Category rules, checked in order. The first category with a keyword that
/// occurs in the text wins.
pub const CATEGORY_RULES: &[(&str, &[&str])] = &[
    (
        "technology",
        &[
            "javascript", "python", "java", "react", "vue", "编程", "开发", "代码",
            "api", "算法", "algorithm", "programming",
        ],
    ),
    ("life", &["生活", "日常", "感悟", "随笔", "心情", "体验"]),
    ("study", &["学习", "教程", "笔记", "总结", "经验", "分享", "tutorial"]),
    ("tools", &["工具", "软件", "应用", "效率", "推荐"]),
    ("reflection", &["思考", "观点", "看法", "理解", "感想"]),
];

/// Pick a category for a post by scanning its lowercased title and body.
pub fn infer_category(title: &str, content: &str) -> &'static str {
    let text = format!("{title} {content}").to_lowercase();

    CATEGORY_RULES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|kw| text.contains(*kw)))
        .map(|(category, _)| *category)
        .unwrap_or(DEFAULT_CATEGORY)
}
