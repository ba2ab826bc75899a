use std::io::BufWriter;

use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference};

use crate::{
    errors::AppResult,
    models::domain::test::{OptionKey, Test},
    models::domain::test_attempt::{answer_key, TestAttempt},
};

const PAGE_WIDTH_MM: f64 = 210.0;
const PAGE_HEIGHT_MM: f64 = 297.0;
const MARGIN_MM: f64 = 20.0;
const LINE_HEIGHT_MM: f64 = 6.0;
const WRAP_COLUMNS: usize = 90;

/// Renders attempt results and test summaries as paginated A4 PDFs.
/// Layout is a vertical cursor; crossing the bottom margin starts a page.
pub struct ReportService;

impl ReportService {
    pub fn result_filename(test_name: &str) -> String {
        format!("{}-Result.pdf", test_name)
    }

    pub fn summary_filename(test_name: &str) -> String {
        format!("{}-Summary.pdf", test_name)
    }

    /// Per-question result report for a finished (or in-flight) attempt:
    /// question text, all four options with the correct one and the
    /// student's wrong pick marked, and marks awarded, then a total line.
    pub fn render_result_pdf(test: &Test, attempt: &TestAttempt) -> AppResult<Vec<u8>> {
        let mut page = ReportPage::new(&format!("{} - Result", test.name))?;

        page.heading(&test.name);
        page.line(&format!("Status: {}", attempt.status.as_str()));
        page.line(&format!(
            "Score: {} / {}   Correct answers: {} / {}",
            attempt.score_achieved,
            test.total_marks,
            attempt.correct_answer_count,
            attempt.total_questions
        ));
        page.line(&format!(
            "Time taken: {}s of {}s allotted",
            attempt.time_taken_seconds,
            attempt.allotted_seconds()
        ));
        page.blank();

        for (index, question) in test.questions.iter().enumerate() {
            let selected = attempt.answers.get(&answer_key(index)).copied();
            let is_correct = selected == Some(question.correct_option);

            page.section(&format!("Q{}. {}", index + 1, question.text));

            for key in OptionKey::ALL {
                let mut marker = "   ";
                if key == question.correct_option {
                    marker = "[correct]";
                } else if Some(key) == selected {
                    marker = "[your answer]";
                }
                page.line(&format!(
                    "  {}) {} {}",
                    key.as_str(),
                    question.options.get(key),
                    marker
                ));
            }

            match selected {
                Some(key) => page.line(&format!("  Your answer: {}", key.as_str())),
                None => page.line("  Your answer: (not answered)"),
            }
            page.line(&format!(
                "  Correct answer: {}",
                question.correct_option.as_str()
            ));
            page.line(&format!(
                "  Marks awarded: {} / {}",
                if is_correct { question.marks } else { 0 },
                question.marks
            ));
            page.blank();
        }

        page.section(&format!(
            "Total: {} / {}",
            attempt.score_achieved, test.total_marks
        ));

        page.finish()
    }

    /// Answer-key summary of a test for its authors: every question with
    /// the correct option marked, no student data.
    pub fn render_summary_pdf(test: &Test) -> AppResult<Vec<u8>> {
        let mut page = ReportPage::new(&format!("{} - Summary", test.name))?;

        page.heading(&test.name);
        if !test.description.is_empty() {
            page.line(&test.description);
        }
        page.line(&format!(
            "Duration: {} minutes   Questions: {}   Total marks: {}",
            test.duration_minutes,
            test.questions.len(),
            test.total_marks
        ));
        page.line(&format!(
            "Attempts so far: {}   Highest score: {}",
            test.attempts, test.highest_score
        ));
        page.blank();

        for (index, question) in test.questions.iter().enumerate() {
            page.section(&format!(
                "Q{}. {} ({} marks)",
                index + 1,
                question.text,
                question.marks
            ));

            for key in OptionKey::ALL {
                let marker = if key == question.correct_option {
                    "[correct]"
                } else {
                    ""
                };
                page.line(&format!(
                    "  {}) {} {}",
                    key.as_str(),
                    question.options.get(key),
                    marker
                ));
            }
            page.blank();
        }

        page.finish()
    }
}

/// Cursor-driven page writer over printpdf. Tracks the vertical position and
/// breaks to a fresh page when a line would cross the bottom margin.
struct ReportPage {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    font: IndirectFontRef,
    bold_font: IndirectFontRef,
    cursor_y: f64,
}

impl ReportPage {
    fn new(title: &str) -> AppResult<Self> {
        let (doc, page, layer) =
            PdfDocument::new(title, Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
        let font = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(pdf_error)?;
        let bold_font = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(pdf_error)?;
        let layer = doc.get_page(page).get_layer(layer);

        Ok(Self {
            doc,
            layer,
            font,
            bold_font,
            cursor_y: PAGE_HEIGHT_MM - MARGIN_MM,
        })
    }

    fn heading(&mut self, text: &str) {
        self.write_wrapped(text, 16.0, true);
        self.cursor_y -= LINE_HEIGHT_MM / 2.0;
    }

    fn section(&mut self, text: &str) {
        self.write_wrapped(text, 11.0, true);
    }

    fn line(&mut self, text: &str) {
        self.write_wrapped(text, 10.0, false);
    }

    fn blank(&mut self) {
        self.cursor_y -= LINE_HEIGHT_MM;
    }

    fn write_wrapped(&mut self, text: &str, font_size: f64, bold: bool) {
        for segment in wrap_text(text, WRAP_COLUMNS) {
            self.advance_line();
            let font = if bold { &self.bold_font } else { &self.font };
            self.layer
                .use_text(segment, font_size, Mm(MARGIN_MM), Mm(self.cursor_y), font);
        }
    }

    fn advance_line(&mut self) {
        self.cursor_y -= LINE_HEIGHT_MM;
        if self.cursor_y < MARGIN_MM {
            let (page, layer) = self
                .doc
                .add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.cursor_y = PAGE_HEIGHT_MM - MARGIN_MM - LINE_HEIGHT_MM;
        }
    }

    fn finish(self) -> AppResult<Vec<u8>> {
        let mut buffer = Vec::new();
        {
            let mut writer = BufWriter::new(&mut buffer);
            self.doc.save(&mut writer).map_err(pdf_error)?;
        }
        Ok(buffer)
    }
}

fn pdf_error(err: impl std::fmt::Display) -> crate::errors::AppError {
    crate::errors::AppError::InternalError(format!("PDF rendering error: {}", err))
}

/// Greedy word wrap; long unbroken words get a line of their own.
fn wrap_text(text: &str, columns: usize) -> Vec<String> {
    if text.chars().count() <= columns {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if !current.is_empty() && current.chars().count() + word.chars().count() + 1 > columns {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::domain::test::fixtures::{question, two_question_test};
    use crate::models::domain::test_attempt::TestAttempt;

    #[test]
    fn result_pdf_is_a_pdf_document() {
        let test = two_question_test();
        let mut attempt = TestAttempt::start(&test, "student-1");
        attempt.answers.insert(answer_key(0), OptionKey::A);
        attempt.score_achieved = 2;
        attempt.correct_answer_count = 1;

        let bytes = ReportService::render_result_pdf(&test, &attempt).unwrap();

        assert!(bytes.starts_with(b"%PDF"));
        assert!(bytes.len() > 500);
    }

    #[test]
    fn summary_pdf_is_a_pdf_document() {
        let test = two_question_test();
        let bytes = ReportService::render_summary_pdf(&test).unwrap();

        assert!(bytes.starts_with(b"%PDF"));
        assert!(bytes.len() > 500);
    }

    #[test]
    fn long_tests_span_multiple_pages_without_error() {
        let mut test = two_question_test();
        for i in 0..60 {
            test.questions
                .push(question(&format!("Filler question number {}", i), OptionKey::C, 1));
        }
        test.recompute_total_marks();

        let attempt = TestAttempt::start(&test, "student-1");
        let bytes = ReportService::render_result_pdf(&test, &attempt).unwrap();

        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn filenames_follow_the_export_convention() {
        assert_eq!(
            ReportService::result_filename("Maths Basics"),
            "Maths Basics-Result.pdf"
        );
        assert_eq!(
            ReportService::summary_filename("Maths Basics"),
            "Maths Basics-Summary.pdf"
        );
    }

    #[test]
    fn wrap_text_splits_long_lines() {
        let text = "word ".repeat(40);
        let lines = wrap_text(text.trim(), 30);

        assert!(lines.len() > 1);
        for line in &lines {
            assert!(line.chars().count() <= 30);
        }
    }

    #[test]
    fn wrap_text_keeps_short_lines_intact() {
        let lines = wrap_text("short line", 90);
        assert_eq!(lines, vec!["short line".to_string()]);
    }
}
