//! Summary image renderer
//!
//! Lays the refresh summary out as a fixed-size SVG document and rasterizes
//! it to PNG with resvg. The output always replaces the single artifact at
//! the configured path.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use resvg::tiny_skia;
use resvg::usvg::{fontdb, Options, Tree};

use crate::models::GdpRanking;
use crate::utils::error::RenderError;
use crate::utils::format_optional_gdp;

const PREFERRED_FAMILIES: &[&str] = &["DejaVu Sans", "Liberation Sans", "Arial", "Helvetica"];

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Summary image renderer
pub struct SummaryRenderer {
    image_path: PathBuf,
    fonts_dir: PathBuf,
    fonts: OnceLock<(Arc<fontdb::Database>, String)>,
}

impl SummaryRenderer {
    const WIDTH: u32 = 1000;
    const HEIGHT: u32 = 600;
    const X: u32 = 40;
    const TITLE_SIZE: u32 = 36;
    const TEXT_SIZE: u32 = 20;
    const ROW_HEIGHT: u32 = 30;
    const MAX_ENTRIES: usize = 5;

    /// Create a new renderer
    pub fn new(image_path: impl Into<PathBuf>, fonts_dir: impl Into<PathBuf>) -> Self {
        Self {
            image_path: image_path.into(),
            fonts_dir: fonts_dir.into(),
            fonts: OnceLock::new(),
        }
    }

    /// Path of the generated artifact
    pub fn image_path(&self) -> &Path {
        &self.image_path
    }

    /// Render the summary and overwrite the artifact
    pub fn render(
        &self,
        total_countries: u64,
        top: &[GdpRanking],
        refreshed_at: &str,
    ) -> Result<PathBuf, RenderError> {
        let svg = Self::summary_svg(total_countries, top, refreshed_at);
        let png = self.rasterize(&svg)?;

        if let Some(parent) = self.image_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        // Unique per call: concurrent renders must never share a staging file
        let tmp_path = self.image_path.with_extension(format!(
            "png.{}.{}.tmp",
            std::process::id(),
            TMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        std::fs::write(&tmp_path, &png)?;
        if let Err(e) = std::fs::rename(&tmp_path, &self.image_path) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(e.into());
        }

        tracing::info!(
            path = %self.image_path.display(),
            bytes = png.len(),
            "Generated summary image"
        );
        Ok(self.image_path.clone())
    }

    /// Text lines of the summary, top to bottom
    pub fn summary_lines(total_countries: u64, top: &[GdpRanking], refreshed_at: &str) -> Vec<String> {
        let mut lines = vec![
            format!("Countries Cached: {total_countries}"),
            format!("Last refreshed: {refreshed_at}"),
            String::from("Top 5 Countries by Estimated GDP"),
        ];
        lines.extend(top.iter().take(Self::MAX_ENTRIES).enumerate().map(|(i, entry)| {
            format!(
                "{}. {} — {}",
                i + 1,
                entry.name,
                format_optional_gdp(entry.estimated_gdp)
            )
        }));
        lines
    }

    /// Build the SVG document
    pub fn summary_svg(total_countries: u64, top: &[GdpRanking], refreshed_at: &str) -> String {
        let lines = Self::summary_lines(total_countries, top, refreshed_at);
        let mut body = String::new();

        // Title baseline sits one font size below the 40px top margin.
        let mut y = 40 + Self::TITLE_SIZE;
        for (i, line) in lines.iter().enumerate() {
            let (size, weight) = if i == 0 {
                (Self::TITLE_SIZE, "bold")
            } else {
                (Self::TEXT_SIZE, "normal")
            };
            body.push_str(&format!(
                r##"<text x="{}" y="{}" font-size="{}" font-weight="{}" fill="#141414">{}</text>"##,
                Self::X,
                y,
                size,
                weight,
                escape_xml(line)
            ));
            y += match i {
                0 => 44,
                1 => 40,
                _ => Self::ROW_HEIGHT,
            };
        }

        format!(
            r##"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}"><rect width="100%" height="100%" fill="#ffffff"/>{body}</svg>"##,
            w = Self::WIDTH,
            h = Self::HEIGHT,
        )
    }

    fn rasterize(&self, svg: &str) -> Result<Vec<u8>, RenderError> {
        let (fontdb, family) = self.fonts.get_or_init(|| load_fonts(&self.fonts_dir));

        let mut options = Options::default();
        options.font_family = family.clone();
        options.fontdb = Arc::clone(fontdb);

        let tree = Tree::from_str(svg, &options).map_err(|e| RenderError::Svg(e.to_string()))?;

        let mut pixmap = tiny_skia::Pixmap::new(Self::WIDTH, Self::HEIGHT).ok_or(
            RenderError::Pixmap {
                width: Self::WIDTH,
                height: Self::HEIGHT,
            },
        )?;
        resvg::render(&tree, tiny_skia::Transform::default(), &mut pixmap.as_mut());

        pixmap
            .encode_png()
            .map_err(|e| RenderError::Encode(e.to_string()))
    }
}

/// Load fonts from `dir`, then system fonts, and pick a family to render with
///
/// Never fails: with no fonts at all, text is simply not drawn.
fn load_fonts(dir: &Path) -> (Arc<fontdb::Database>, String) {
    let mut db = fontdb::Database::new();
    if dir.is_dir() {
        db.load_fonts_dir(dir);
    }
    tracing::debug!("Loaded {} font faces from {}", db.len(), dir.display());

    if db.is_empty() {
        db.load_system_fonts();
        tracing::debug!("Loaded {} system font faces", db.len());
    }

    let family = pick_family(&db);
    if db.is_empty() {
        tracing::warn!("No fonts available, summary image will contain no text");
    } else {
        tracing::debug!(family = %family, "Selected summary font");
    }

    (Arc::new(db), family)
}

fn pick_family(db: &fontdb::Database) -> String {
    let available: Vec<&str> = db
        .faces()
        .flat_map(|face| face.families.iter().map(|(name, _)| name.as_str()))
        .collect();

    PREFERRED_FAMILIES
        .iter()
        .find(|preferred| available.contains(preferred))
        .map(|f| f.to_string())
        .or_else(|| available.first().map(|f| f.to_string()))
        .unwrap_or_else(|| String::from("sans-serif"))
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
