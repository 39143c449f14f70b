//! Task prompt templates.
//!
//! Each task numbers the leading chunks of the document (in document order,
//! not by retrieval relevance) into a context block and wraps it in a fixed
//! instruction template. The number of chunks used is
//! [`TaskType::context_window`].
//!
//! The templates contain the marker phrases [`SUMMARY_MARKER`],
//! [`ANALYSIS_MARKER`], and [`QUESTIONS_MARKER`], which the simulated
//! completer keys its canned responses on.

use crate::models::TaskType;

pub const SUMMARY_MARKER: &str = "总结要点";
pub const ANALYSIS_MARKER: &str = "详细分析";
pub const QUESTIONS_MARKER: &str = "出题";
pub const QUESTIONS_MARKER_ALT: &str = "题目";

/// Builds the prompt for `task` from the first chunks of `chunks`.
pub fn build_prompt(task: TaskType, chunks: &[String]) -> String {
    let context = numbered_context(chunks, task.context_window());
    match task {
        TaskType::Summary => summary_prompt(&context),
        TaskType::Analysis => analysis_prompt(&context),
        TaskType::Questions => questions_prompt(&context),
    }
}

fn numbered_context(chunks: &[String], limit: usize) -> String {
    chunks
        .iter()
        .take(limit)
        .enumerate()
        .map(|(i, chunk)| format!("{}. {}", i + 1, chunk))
        .collect::<Vec<_>>()
        .join("\n")
}

fn summary_prompt(context: &str) -> String {
    format!(
        "请基于以下文档内容，生成一个结构化的总结要点：

{context}

请按照以下格式输出：
## 主要内容概述
[简要概述文档的核心内容]

## 关键要点
1. [要点1]
2. [要点2]
3. [要点3]
...

## 重要结论
[总结文档的主要结论或建议]

请确保要点清晰、有条理，涵盖文档的核心信息。"
    )
}

fn analysis_prompt(context: &str) -> String {
    format!(
        "请对以下文档内容进行详细分析：

{context}

请按照以下结构进行分析：
## 内容深度解析
[对文档内容进行深入分析和解读]

## 核心观点分析
[分析文档中的主要观点和论据]

## 逻辑结构分析
[分析文档的组织结构和逻辑关系]

## 价值与意义
[分析文档的价值、意义和潜在应用]

请提供深入、专业的分析，突出文档的独特见解和价值。"
    )
}

fn questions_prompt(context: &str) -> String {
    format!(
        "基于以下文档内容，请创建多种题型的测试题目：

{context}

请创建以下类型的题目：

## 选择题（5道）
1. [题目]
   A. [选项A]
   B. [选项B]
   C. [选项C]
   D. [选项D]
   正确答案：[正确选项]

## 判断题（3道）
1. [陈述] (正确/错误)
2. [陈述] (正确/错误)
3. [陈述] (正确/错误)

## 简答题（2道）
1. [问题]
   [参考答案要点]

## 填空题（3道）
1. [包含空格的句子]，正确答案：[填空内容]

请确保题目覆盖文档的核心内容，难度适中，并包含正确答案。"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("片段{}。", i)).collect()
    }

    #[test]
    fn summary_uses_first_ten_chunks() {
        let prompt = build_prompt(TaskType::Summary, &numbered(20));
        assert!(prompt.contains("10. 片段10。"));
        assert!(!prompt.contains("片段11。"));
        assert!(prompt.contains("## 主要内容概述"));
        assert!(prompt.contains("## 关键要点"));
        assert!(prompt.contains("## 重要结论"));
        assert!(prompt.contains(SUMMARY_MARKER));
    }

    #[test]
    fn analysis_uses_first_fifteen_chunks() {
        let prompt = build_prompt(TaskType::Analysis, &numbered(20));
        assert!(prompt.contains("15. 片段15。"));
        assert!(!prompt.contains("片段16。"));
        for heading in ["内容深度解析", "核心观点分析", "逻辑结构分析", "价值与意义"] {
            assert!(prompt.contains(heading), "missing {}", heading);
        }
        assert!(prompt.contains(ANALYSIS_MARKER));
        assert!(!prompt.contains(SUMMARY_MARKER));
    }

    #[test]
    fn questions_uses_first_twelve_chunks() {
        let prompt = build_prompt(TaskType::Questions, &numbered(20));
        assert!(prompt.contains("12. 片段12。"));
        assert!(!prompt.contains("片段13。"));
        for heading in ["选择题（5道）", "判断题（3道）", "简答题（2道）", "填空题（3道）", "正确答案"] {
            assert!(prompt.contains(heading), "missing {}", heading);
        }
        assert!(prompt.contains(QUESTIONS_MARKER_ALT));
        assert!(!prompt.contains(SUMMARY_MARKER));
        assert!(!prompt.contains(ANALYSIS_MARKER));
    }

    #[test]
    fn short_documents_use_every_chunk() {
        let prompt = build_prompt(TaskType::Summary, &numbered(2));
        assert!(prompt.contains("1. 片段1。\n2. 片段2。"));
    }
}
