//! Single-document conversion: extract → reflow → classify → translate →
//! assemble → write.
//!
//! [`Converter`] owns the two external capabilities a conversion needs (page
//! text and, optionally, translation) and is shared by every file of a
//! batch. All per-document state, including translation pacing, lives in
//! the call to [`Converter::convert`], so concurrent conversions never wait
//! on each other.

use crate::config::{ConversionConfig, TranslationMode};
use crate::document::Document;
use crate::error::Pdf2MdError;
use crate::output::{ConversionOutput, ConversionStats};
use crate::pipeline::assemble::{join_pages, render_document, split_pages, DocumentHeader, PAGE_SENTINEL};
use crate::pipeline::extract::{extract_blocking, PdfTextSource};
use crate::pipeline::language::LanguageClassifier;
use crate::pipeline::reflow::ReflowOptions;
use crate::pipeline::translate::TranslationGateway;
use crate::translator::Translator;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Converts documents with a fixed configuration.
pub struct Converter {
    config: ConversionConfig,
    source: Arc<dyn PdfTextSource>,
    translation: Option<(Arc<dyn Translator>, LanguageClassifier)>,
}

impl Converter {
    /// Create a converter.
    ///
    /// Translation runs only when `config.translate` is set *and* a
    /// translator is supplied.
    ///
    /// # Errors
    /// [`Pdf2MdError::InvalidConfig`] when translation is enabled for a
    /// language without a built-in classifier profile.
    pub fn new(
        config: ConversionConfig,
        source: Arc<dyn PdfTextSource>,
        translator: Option<Arc<dyn Translator>>,
    ) -> Result<Self, Pdf2MdError> {
        let translation = match translator {
            Some(t) if config.translate => {
                let classifier = LanguageClassifier::for_languages(
                    &config.source_lang,
                    &config.target_lang,
                    config.classifier,
                )?;
                Some((t, classifier))
            }
            _ => None,
        };
        Ok(Self {
            config,
            source,
            translation,
        })
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    /// Whether this converter will send text to a translation backend.
    pub fn translation_enabled(&self) -> bool {
        self.translation.is_some()
    }

    /// Convert the file at `path` to Markdown.
    ///
    /// # Errors
    /// Only extraction problems are fatal. Translation failures degrade to the
    /// original text and are counted in [`ConversionStats`].
    pub async fn convert(&self, path: &Path) -> Result<ConversionOutput, Pdf2MdError> {
        let start = Instant::now();
        info!("Converting {}", path.display());

        let raw = extract_blocking(Arc::clone(&self.source), path).await?;
        let options = ReflowOptions {
            keep_blank_lines: self.config.keep_blank_lines,
        };
        let document = Document::from_raw(path, raw, &options);

        let mut output = self.convert_document(&document).await;
        output.stats.duration_ms = start.elapsed().as_millis() as u64;

        info!(
            "Converted {}: {} page(s), {} translated, {}/{} chunk(s) failed, {}ms",
            path.display(),
            output.stats.total_pages,
            output.stats.pages_translated,
            output.stats.chunks_failed,
            output.stats.chunks_total,
            output.stats.duration_ms
        );
        Ok(output)
    }

    /// Translate (where needed) and assemble an already reflowed document.
    pub async fn convert_document(&self, document: &Document) -> ConversionOutput {
        let mut stats = ConversionStats {
            total_pages: document.pages.len(),
            ..Default::default()
        };
        let texts: Vec<String> = document.pages.iter().map(|p| p.text()).collect();

        let pages = match &self.translation {
            None => texts,
            Some((translator, classifier)) => match self.config.translation_mode {
                TranslationMode::PerPage => {
                    self.translate_per_page(document, texts, translator, classifier, &mut stats)
                        .await
                }
                TranslationMode::WholeDocument => {
                    self.translate_whole(document, texts, translator, classifier, &mut stats)
                        .await
                }
            },
        };
        stats.output_pages = pages.len();

        let title = document.title();
        let mut notes = Vec::new();
        if self.translation.is_some() {
            notes.push(format!(
                "Automatic translation: {} → {}",
                self.config.source_lang, self.config.target_lang
            ));
        }
        let header = DocumentHeader {
            title: &title,
            notes,
            metadata: document.metadata.entries(),
            include_metadata: self.config.include_metadata,
            page_label: &self.config.page_label,
        };

        ConversionOutput {
            markdown: render_document(&header, &pages),
            metadata: document.metadata.clone(),
            stats,
        }
    }

    async fn translate_per_page(
        &self,
        document: &Document,
        texts: Vec<String>,
        translator: &Arc<dyn Translator>,
        classifier: &LanguageClassifier,
        stats: &mut ConversionStats,
    ) -> Vec<String> {
        let mut gateway = TranslationGateway::new(Arc::clone(translator), &self.config);
        let mut out = Vec::with_capacity(texts.len());

        for (page, text) in document.pages.iter().zip(texts) {
            if page.is_blank() || !classifier.needs_translation(&text) {
                out.push(text);
                continue;
            }
            debug!("Page {}: translating", page.number);
            let translated = gateway.translate_text(&text).await;
            stats.chunks_total += translated.chunks_total;
            stats.chunks_translated += translated.chunks_translated;
            stats.chunks_failed += translated.chunks_failed;
            if translated.any_translated() {
                stats.pages_translated += 1;
            }
            out.push(translated.text);
        }

        out
    }

    /// Blank pages stay out of the joined stream and keep their placeholder,
    /// as in per-page mode.
    async fn translate_whole(
        &self,
        document: &Document,
        texts: Vec<String>,
        translator: &Arc<dyn Translator>,
        classifier: &LanguageClassifier,
        stats: &mut ConversionStats,
    ) -> Vec<String> {
        let content: Vec<usize> = document
            .pages
            .iter()
            .enumerate()
            .filter(|(_, p)| !p.is_blank())
            .map(|(i, _)| i)
            .collect();
        if content.is_empty() {
            return texts;
        }

        let content_texts: Vec<String> = content.iter().map(|&i| texts[i].clone()).collect();
        let blob = join_pages(&content_texts);
        if !classifier.needs_translation(&blob) {
            return texts;
        }

        let mut gateway =
            TranslationGateway::new(Arc::clone(translator), &self.config).with_sentinel(PAGE_SENTINEL);
        let translated = gateway.translate_text(&blob).await;
        stats.chunks_total += translated.chunks_total;
        stats.chunks_translated += translated.chunks_translated;
        stats.chunks_failed += translated.chunks_failed;
        if !translated.any_translated() {
            return texts;
        }

        let (pages, mismatch) = split_pages(&translated.text, content.len());
        stats.assembly_mismatch = mismatch;
        if mismatch {
            stats.pages_translated = 1;
            return pages;
        }

        let mut out = texts;
        for (&index, page) in content.iter().zip(pages) {
            if out[index] != page {
                stats.pages_translated += 1;
            }
            out[index] = page;
        }
        out
    }

    /// Convert `path` and write the Markdown to `output_path`.
    ///
    /// Uses atomic write (temp file + rename) so the output path never holds
    /// a partial document.
    pub async fn convert_to_file(
        &self,
        path: &Path,
        output_path: &Path,
    ) -> Result<ConversionStats, Pdf2MdError> {
        let output = self.convert(path).await?;
        write_atomic(output_path, &output.markdown).await?;
        Ok(output.stats)
    }
}

/// Write `contents` to `path` through a sibling temp file and a rename.
pub async fn write_atomic(path: &Path, contents: &str) -> Result<(), Pdf2MdError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| Pdf2MdError::OutputWriteFailed {
                path: path.to_path_buf(),
                source: e,
            })?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = std::path::PathBuf::from(tmp_name);

    tokio::fs::write(&tmp_path, contents)
        .await
        .map_err(|e| Pdf2MdError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(Pdf2MdError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{DocumentMetadata, RawDocument};
    use crate::pipeline::reflow::EMPTY_PAGE_PLACEHOLDER;
    use crate::translator::{MockBehavior, MockTranslator};

    struct StaticSource(Vec<&'static str>);

    impl PdfTextSource for StaticSource {
        fn extract(&self, _path: &Path) -> Result<RawDocument, Pdf2MdError> {
            Ok(RawDocument {
                metadata: DocumentMetadata {
                    page_count: self.0.len(),
                    ..Default::default()
                },
                pages: self.0.iter().map(|s| s.to_string()).collect(),
            })
        }
    }

    const EN: &str = "The contractor shall submit the performance bond to the \
        concession authority within thirty days after the signature of the agreement.";
    const PT: &str = "A contratada deverá apresentar a garantia de execução ao poder \
        concedente no prazo de trinta dias após a assinatura do contrato.";

    fn config() -> ConversionConfig {
        ConversionConfig {
            call_delay_ms: 0,
            max_retries: 0,
            ..Default::default()
        }
    }

    fn converter(
        pages: Vec<&'static str>,
        config: ConversionConfig,
        translator: Option<MockTranslator>,
    ) -> Converter {
        Converter::new(
            config,
            Arc::new(StaticSource(pages)),
            translator.map(|t| Arc::new(t) as Arc<dyn Translator>),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn only_source_language_pages_are_translated() {
        let c = converter(vec![PT, EN], config(), Some(MockTranslator::working()));
        let out = c.convert(Path::new("docs/edital.pdf")).await.unwrap();
        assert!(out.markdown.starts_with("# edital\n"));
        assert!(out.markdown.contains(&format!("## Page 1\n\n{PT}\n")));
        assert!(out.markdown.contains(&format!("## Page 2\n\n[pt] {EN}\n")));
        assert_eq!(out.stats.pages_translated, 1);
        assert_eq!(out.stats.chunks_failed, 0);
    }

    #[tokio::test]
    async fn failing_backend_matches_untranslated_body() {
        let failing = converter(vec![PT, EN], config(), Some(MockTranslator::failing()));
        let plain = converter(
            vec![PT, EN],
            ConversionConfig {
                translate: false,
                ..config()
            },
            None,
        );
        let a = failing.convert(Path::new("x.pdf")).await.unwrap();
        let b = plain.convert(Path::new("x.pdf")).await.unwrap();
        let body = |md: &str| md[md.find("## Page 1").unwrap()..].to_string();
        assert_eq!(body(&a.markdown), body(&b.markdown));
        assert_eq!(a.stats.chunks_failed, 1);
        assert_eq!(a.stats.pages_translated, 0);
    }

    #[tokio::test]
    async fn translation_note_only_when_enabled() {
        let on = converter(vec![PT], config(), Some(MockTranslator::working()));
        let off = converter(vec![PT], config(), None);
        assert!(!off.translation_enabled());
        let md_on = on.convert(Path::new("a.pdf")).await.unwrap().markdown;
        let md_off = off.convert(Path::new("a.pdf")).await.unwrap().markdown;
        assert!(md_on.contains("Automatic translation: en → pt"));
        assert!(!md_off.contains("Automatic translation"));
    }

    #[tokio::test]
    async fn blank_page_gets_placeholder_and_no_call() {
        let mock = MockTranslator::working();
        let c = converter(vec!["   ", EN], config(), Some(mock.clone()));
        let out = c.convert(Path::new("a.pdf")).await.unwrap();
        assert!(out.markdown.contains(&format!("## Page 1\n\n{EMPTY_PAGE_PLACEHOLDER}\n")));
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn whole_document_mode_splits_pages_back() {
        let cfg = ConversionConfig {
            translation_mode: TranslationMode::WholeDocument,
            ..config()
        };
        let c = converter(vec![EN, EN], cfg, Some(MockTranslator::new(MockBehavior::Uppercase)));
        let out = c.convert(Path::new("a.pdf")).await.unwrap();
        assert!(!out.stats.assembly_mismatch);
        assert_eq!(out.stats.output_pages, 2);
        assert_eq!(out.stats.pages_translated, 2);
        assert!(out.markdown.contains("## Page 2\n\nTHE CONTRACTOR"));
        assert!(!out.markdown.contains(PAGE_SENTINEL));
    }

    #[tokio::test]
    async fn whole_document_mode_tolerates_lost_sentinel() {
        let cfg = ConversionConfig {
            translation_mode: TranslationMode::WholeDocument,
            ..config()
        };
        let dropping = MockTranslator::working().with_custom_response(|s| s.replace("[[PAGE_BREAK]]", ""));
        let c = converter(vec![EN, EN, EN], cfg, Some(dropping));
        let out = c.convert(Path::new("a.pdf")).await.unwrap();
        assert!(out.stats.assembly_mismatch);
        assert_eq!(out.stats.total_pages, 3);
        assert_eq!(out.stats.output_pages, 1);
        assert!(out.markdown.contains("## Page 1"));
        assert!(!out.markdown.contains("## Page 2"));
    }

    #[tokio::test]
    async fn whole_document_mode_leaves_blank_pages_alone() {
        let cfg = ConversionConfig {
            translation_mode: TranslationMode::WholeDocument,
            ..config()
        };
        let mock = MockTranslator::new(MockBehavior::Uppercase);
        let c = converter(vec![EN, "  \n ", EN], cfg, Some(mock.clone()));
        let out = c.convert(Path::new("a.pdf")).await.unwrap();
        assert!(!out.stats.assembly_mismatch);
        assert_eq!(out.stats.output_pages, 3);
        assert_eq!(out.stats.pages_translated, 2);
        assert!(out
            .markdown
            .contains(&format!("## Page 2\n\n{EMPTY_PAGE_PLACEHOLDER}\n")));
        assert!(out.markdown.contains("## Page 3\n\nTHE CONTRACTOR"));
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn unknown_language_rejected_only_when_translating() {
        let cfg = ConversionConfig {
            target_lang: "xx".into(),
            ..config()
        };
        let err = Converter::new(
            cfg.clone(),
            Arc::new(StaticSource(vec![])),
            Some(Arc::new(MockTranslator::working())),
        );
        assert!(matches!(err, Err(Pdf2MdError::InvalidConfig(_))));
        assert!(Converter::new(cfg, Arc::new(StaticSource(vec![])), None).is_ok());
    }

    #[tokio::test]
    async fn atomic_write_leaves_no_temp_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let out = dir.path().join("nested/deeper/doc.md");
        write_atomic(&out, "# hi\n").await.unwrap();
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "# hi\n");
        let entries: Vec<_> = std::fs::read_dir(out.parent().unwrap()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }
}
