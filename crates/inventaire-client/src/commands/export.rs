//! Spreadsheet export of the catalog, the directory and the statistics.
//!
//! Sheet contents are built as plain data first so they can be checked
//! without opening a workbook, then rendered with `rust_xlsxwriter` and
//! written atomically next to the target file.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDate, Utc};
use inventaire_shared::constants::{APP_VERSION, EXPORT_FILE_PREFIX};
use inventaire_shared::stats::{self, bar, Bucket, Statistics};
use inventaire_shared::{Article, CurrentUser, UserRecord};
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use tracing::{error, info};

use super::App;
use crate::backend::Backend;
use crate::error::ClientError;

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    Blank,
}

fn text(value: impl Into<String>) -> Cell {
    let value = value.into();
    if value.is_empty() {
        Cell::Blank
    } else {
        Cell::Text(value)
    }
}

fn count(n: usize) -> Cell {
    Cell::Number(n as f64)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: &'static str,
    pub widths: &'static [f64],
    pub rows: Vec<Vec<Cell>>,
    /// Rows written in bold.
    pub bold_rows: Vec<usize>,
}

impl Sheet {
    fn new(name: &'static str, widths: &'static [f64]) -> Self {
        Self {
            name,
            widths,
            rows: Vec::new(),
            bold_rows: Vec::new(),
        }
    }

    fn row(&mut self, cells: Vec<Cell>) {
        self.rows.push(cells);
    }

    fn title(&mut self, cells: Vec<Cell>) {
        self.bold_rows.push(self.rows.len());
        self.rows.push(cells);
    }

    fn gap(&mut self) {
        self.rows.push(Vec::new());
    }
}

/// `inventaire_vch_export_YYYY-MM-DD.xlsx`
pub fn export_file_name(date: NaiveDate) -> String {
    format!("{EXPORT_FILE_PREFIX}_{}.xlsx", date.format("%Y-%m-%d"))
}

fn local_datetime(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%d/%m/%Y %H:%M").to_string()
}

fn articles_sheet(articles: &[Article]) -> Sheet {
    let mut sheet = Sheet::new("Articles", &[15.0, 40.0, 15.0, 20.0, 10.0, 10.0, 15.0, 30.0]);
    sheet.title(
        [
            "Symbole",
            "Désignation",
            "Nature du dépôt",
            "Localisation",
            "Rack",
            "Niveau",
            "Emplacement",
            "Commentaire",
        ]
        .into_iter()
        .map(text)
        .collect(),
    );
    for a in articles {
        sheet.row(vec![
            text(a.symbol.as_str()),
            text(a.designation.as_str()),
            text(a.deposit_nature.as_str()),
            text(a.location.as_str()),
            text(a.rack.as_str()),
            text(a.level.as_str()),
            text(a.slot.as_str()),
            text(a.comment.as_str()),
        ]);
    }
    sheet
}

fn users_sheet(users: &[UserRecord]) -> Sheet {
    let mut sheet = Sheet::new("Utilisateurs", &[12.0, 25.0, 15.0, 10.0, 10.0, 20.0, 15.0]);
    sheet.title(
        [
            "Numéro CP",
            "Nom",
            "Profil",
            "Statut",
            "Code PIN",
            "Dernière connexion",
            "Date de création",
        ]
        .into_iter()
        .map(text)
        .collect(),
    );
    for u in users {
        sheet.row(vec![
            text(u.numero_cp.as_str()),
            text(u.name.as_str()),
            text(u.profile.as_str()),
            text(u.status.as_str()),
            text(if u.has_pin { "Oui" } else { "Non" }),
            text(u.last_login.map(local_datetime).unwrap_or_else(|| "Jamais".to_string())),
            text(
                u.created_at
                    .map(|at| at.with_timezone(&Local).format("%d/%m/%Y").to_string())
                    .unwrap_or_default(),
            ),
        ]);
    }
    sheet
}

fn bar_row(stats: &Statistics, bucket: &Bucket) -> Vec<Cell> {
    vec![
        text(bucket.label.as_str()),
        count(bucket.count),
        text(bar(stats.share(bucket))),
    ]
}

fn stats_sheet(stats: &Statistics, exporter: &CurrentUser, now: DateTime<Local>) -> Sheet {
    let mut sheet = Sheet::new("Statistiques", &[30.0, 15.0, 25.0]);
    sheet.title(vec![text("STATISTIQUES GÉNÉRALES")]);
    sheet.row(vec![text("Total des articles"), count(stats.total_articles)]);
    sheet.row(vec![text("Nombre de localisations"), count(stats.by_location.len())]);
    sheet.row(vec![text("Types de dépôts"), count(stats.by_deposit_nature.len())]);
    if exporter.is_admin() {
        sheet.row(vec![text("Total utilisateurs"), count(stats.total_users)]);
        sheet.row(vec![text("Utilisateurs actifs"), count(stats.active_users)]);
        sheet.row(vec![text("Utilisateurs bloqués"), count(stats.blocked_users)]);
        sheet.row(vec![text("Utilisateurs avec PIN"), count(stats.users_with_pin)]);
    }

    sheet.gap();
    sheet.title(vec![text("RÉPARTITION PAR LOCALISATION")]);
    for b in &stats.by_location {
        sheet.row(bar_row(stats, b));
    }

    sheet.gap();
    sheet.title(vec![text("RÉPARTITION PAR NATURE DE DÉPÔT")]);
    for b in &stats.by_deposit_nature {
        sheet.row(bar_row(stats, b));
    }

    sheet.gap();
    sheet.title(vec![text("INFORMATIONS D'EXPORT")]);
    sheet.row(vec![
        text("Date d'export"),
        text(now.format("%d/%m/%Y %H:%M").to_string()),
    ]);
    let name = if exporter.name.is_empty() {
        "Utilisateur inconnu"
    } else {
        exporter.name.as_str()
    };
    sheet.row(vec![text("Exporté par"), text(name)]);
    sheet.row(vec![text("Version"), text(APP_VERSION)]);
    sheet
}

fn distribution_sheet(stats: &Statistics) -> Sheet {
    let mut sheet = Sheet::new("Répartition", &[20.0, 15.0, 12.0, 25.0]);
    sheet.title(vec![text("RÉPARTITION DÉTAILLÉE")]);
    sheet.gap();

    let section = |sheet: &mut Sheet, heading: &str, buckets: &[Bucket]| {
        sheet.title(vec![
            text(heading),
            text("Nombre d'articles"),
            text("Pourcentage"),
            text("Graphique"),
        ]);
        for b in buckets {
            let pct = stats.share(b);
            sheet.row(vec![
                text(b.label.as_str()),
                count(b.count),
                text(format!("{pct}%")),
                text(bar(pct)),
            ]);
        }
    };

    section(&mut sheet, "LOCALISATIONS", &stats.by_location);
    sheet.gap();
    section(&mut sheet, "NATURES DE DÉPÔT", &stats.by_deposit_nature);
    sheet
}

/// Every sheet of the workbook, in order. The directory sheet only appears
/// for an administrator with a non-empty directory.
pub fn build_sheets(
    articles: &[Article],
    users: &[UserRecord],
    exporter: &CurrentUser,
    now: DateTime<Local>,
) -> Vec<Sheet> {
    let visible_users: &[UserRecord] = if exporter.is_admin() { users } else { &[] };
    let stats = stats::aggregate(articles, visible_users);

    let mut sheets = vec![articles_sheet(articles)];
    if !visible_users.is_empty() {
        sheets.push(users_sheet(visible_users));
    }
    sheets.push(stats_sheet(&stats, exporter, now));
    sheets.push(distribution_sheet(&stats));
    sheets
}

pub fn render_workbook(sheets: &[Sheet]) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();

    for sheet in sheets {
        let mut worksheet = Worksheet::new();
        worksheet.set_name(sheet.name)?;
        for (col, width) in sheet.widths.iter().enumerate() {
            worksheet.set_column_width(col as u16, *width)?;
        }

        for (r, cells) in sheet.rows.iter().enumerate() {
            let is_bold = sheet.bold_rows.contains(&r);
            for (c, cell) in cells.iter().enumerate() {
                let (row, col) = (r as u32, c as u16);
                match cell {
                    Cell::Text(s) if is_bold => {
                        worksheet.write_string_with_format(row, col, s, &bold)?;
                    }
                    Cell::Text(s) => {
                        worksheet.write_string(row, col, s)?;
                    }
                    Cell::Number(n) => {
                        worksheet.write_number(row, col, *n)?;
                    }
                    Cell::Blank => {}
                }
            }
        }
        workbook.push_worksheet(worksheet);
    }

    workbook.save_to_buffer()
}

/// Write `bytes` to `dir/file_name` through a temporary file in `dir`, so a
/// failure never leaves a partial file behind.
pub fn write_atomically(dir: &Path, file_name: &str, bytes: &[u8]) -> std::io::Result<PathBuf> {
    let mut tmp = tempfile::Builder::new()
        .prefix(".inventaire_export")
        .suffix(".tmp")
        .tempfile_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;

    let target = dir.join(file_name);
    tmp.persist(&target).map_err(|e| e.error)?;
    Ok(target)
}

impl<B: Backend> App<B> {
    /// Export into the configured directory.
    pub fn export(&mut self) -> Result<PathBuf, ClientError> {
        let dir = self.config.export_dir.clone();
        self.export_to(&dir)
    }

    pub fn export_to(&mut self, dir: &Path) -> Result<PathBuf, ClientError> {
        let user = self.require_admin()?;

        let sheets = build_sheets(&self.state.articles, &self.state.users, &user, Local::now());
        let file_name = export_file_name(Utc::now().date_naive());
        let written = render_workbook(&sheets)
            .map_err(|e| e.to_string())
            .and_then(|bytes| write_atomically(dir, &file_name, &bytes).map_err(|e| e.to_string()));

        match written {
            Ok(path) => {
                let exported = self.state.articles.len();
                info!(path = %path.display(), articles = exported, "Workbook exported");
                self.notifier.success(format!(
                    "📊 Export Excel généré avec succès! ({exported} articles exportés)"
                ));
                Ok(path)
            }
            Err(e) => {
                error!(dir = %dir.display(), error = %e, "Export failed");
                self.notifier
                    .error("❌ Erreur lors de la génération du fichier Excel");
                Err(ClientError::Export(e))
            }
        }
    }
}
