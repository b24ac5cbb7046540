//! Server-rendered HTML for the sign-in page and the stock dashboard.

use std::fmt::Write as _;

use oilstock_inventory::{
    format_quantity, parse_units, Lot, MovementKind, PackageSize, StockRow, Vintage, Warehouse, WarehouseFilter,
    DEFAULT_VINTAGE, VINTAGES,
};

use crate::app::dto::MovementForm;
use crate::context::SessionContext;

pub const LINK_SENT: &str = "Ti ho inviato un link via email. Aprilo per accedere.";
pub const SELECT_WAREHOUSE_AND_PRODUCT: &str = "Seleziona magazzino e prodotto.";
pub const MOVEMENT_RECORDED: &str = "Movimento registrato.";
const EMPTY_STOCK: &str = "Nessuna giacenza (registra un carico per iniziare).";

/// Banner shown above the page content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Alert {
    Info(String),
    Error(String),
}

impl Alert {
    pub fn error(message: impl Into<String>) -> Self {
        Alert::Error(message.into())
    }

    pub fn info(message: impl Into<String>) -> Self {
        Alert::Info(message.into())
    }

    fn render(&self, out: &mut String) {
        let (class, role, text) = match self {
            Alert::Info(text) => ("alert info", "status", text),
            Alert::Error(text) => ("alert error", "alert", text),
        };
        let _ = write!(out, r#"<p class="{class}" role="{role}">{}</p>"#, escape(text));
    }
}

/// Values the movement form is rendered with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovementFormState {
    pub warehouse_id: String,
    pub year: Vintage,
    pub lot: Lot,
    pub size: PackageSize,
    pub kind: MovementKind,
    pub units: String,
    pub note: String,
}

impl Default for MovementFormState {
    fn default() -> Self {
        Self {
            warehouse_id: String::new(),
            year: DEFAULT_VINTAGE,
            lot: Lot::A,
            size: PackageSize::Ml500,
            kind: MovementKind::In,
            units: "1".to_string(),
            note: String::new(),
        }
    }
}

impl MovementFormState {
    /// Echo a submitted form back, falling back to defaults for unreadable codes.
    pub fn from_submitted(form: &MovementForm) -> Self {
        let defaults = Self::default();
        Self {
            warehouse_id: form.warehouse_id.trim().to_string(),
            year: form.year.trim().parse().unwrap_or(defaults.year),
            lot: form.lot.parse().unwrap_or(defaults.lot),
            size: form.size.parse().unwrap_or(defaults.size),
            kind: form.kind.parse().unwrap_or(defaults.kind),
            units: form.units.clone(),
            note: form.note.clone(),
        }
    }

    /// Absolute millilitres shown on the submit button; 0 while units are invalid.
    pub fn preview_ml(&self) -> i64 {
        parse_units(&self.units)
            .ok()
            .and_then(|units| units.checked_mul(self.size.ml_per_unit()))
            .unwrap_or(0)
    }
}

/// Everything the dashboard shows for one request.
pub struct Dashboard<'a> {
    pub session: &'a SessionContext,
    pub warehouses: &'a [Warehouse],
    pub stock: &'a [StockRow],
    pub filter: &'a WarehouseFilter,
    pub form: &'a MovementFormState,
    pub alerts: &'a [Alert],
}

/// Escape text for use in HTML element content and quoted attributes.
pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

fn layout(body: &str) -> String {
    format!(
        r#"<!doctype html>
<html lang="it">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Gestione Olio</title>
<style>
body {{ font-family: system-ui, sans-serif; max-width: 960px; margin: 2rem auto; padding: 0 1rem; }}
header {{ display: flex; justify-content: space-between; align-items: center; gap: 1rem; }}
table {{ border-collapse: collapse; width: 100%; margin: 1rem 0; }}
th, td {{ border-bottom: 1px solid #ddd; padding: .4rem; text-align: left; }}
td.num {{ text-align: right; }}
.alert {{ padding: .6rem; border-radius: 4px; }}
.alert.info {{ background: #eef6ee; }}
.alert.error {{ background: #fbeaea; }}
form.movement {{ display: grid; grid-template-columns: repeat(auto-fill, minmax(140px, 1fr)); gap: .5rem; }}
</style>
</head>
<body>
{body}
</body>
</html>
"#
    )
}

/// Sign-in page with the email form.
pub fn sign_in_page(alerts: &[Alert], email: &str) -> String {
    let mut body = String::from("<h1>Gestione Olio</h1>\n");
    for alert in alerts {
        alert.render(&mut body);
    }
    let _ = write!(
        body,
        r#"
<form method="post" action="/auth/sign-in">
<label>Email <input type="email" name="email" required value="{}"></label>
<button type="submit">Accedi</button>
</form>"#,
        escape(email)
    );
    layout(&body)
}

/// Signed-in page: role badge, warehouse selector, stock table, movement form.
pub fn dashboard_page(view: &Dashboard<'_>) -> String {
    let mut body = String::new();

    let role = view.session.role().map_or("...", |r| r.as_str());
    let _ = write!(
        body,
        r#"<header>
<h1>Gestione Olio</h1>
<div><span class="role">Ruolo: {}</span>
<form method="post" action="/auth/sign-out" style="display:inline"><button type="submit">Esci</button></form></div>
</header>
"#,
        escape(role)
    );

    for alert in view.alerts {
        alert.render(&mut body);
    }

    render_selector(&mut body, view.warehouses, view.filter);
    render_stock_table(&mut body, view.stock);
    if view.session.can_operate() {
        render_movement_form(&mut body, view.warehouses, view.filter, view.form);
    }

    layout(&body)
}

fn render_selector(out: &mut String, warehouses: &[Warehouse], filter: &WarehouseFilter) {
    out.push_str(
        r#"<form method="get" action="/">
<label>Magazzino <select name="warehouse" onchange="this.form.submit()">
"#,
    );
    option(out, WarehouseFilter::ALL_VALUE, "Tutti", filter.name().is_none());
    for warehouse in warehouses {
        let selected = filter.name() == Some(warehouse.name.as_str());
        option(out, &warehouse.name, &warehouse.name, selected);
    }
    out.push_str("</select></label>\n<noscript><button type=\"submit\">Filtra</button></noscript>\n</form>\n");
}

fn render_stock_table(out: &mut String, stock: &[StockRow]) {
    out.push_str(
        "<table>\n<thead><tr><th>Magazzino</th><th>Annata</th><th>Lotto</th><th>Formato</th>\
         <th>Giacenza (ml)</th><th>≈ Unità</th></tr></thead>\n<tbody>\n",
    );
    if stock.is_empty() {
        let _ = writeln!(out, r#"<tr><td colspan="6">{EMPTY_STOCK}</td></tr>"#);
    }
    // Formato shows the view's size code as stored.
    for row in stock {
        let _ = writeln!(
            out,
            r#"<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td class="num">{}</td><td class="num">{}</td></tr>"#,
            escape(&row.warehouse),
            row.year,
            row.lot,
            row.size.code(),
            format_quantity(row.qty_ml),
            format_quantity(row.approx_units),
        );
    }
    out.push_str("</tbody>\n</table>\n");
}

fn render_movement_form(out: &mut String, warehouses: &[Warehouse], filter: &WarehouseFilter, form: &MovementFormState) {
    out.push_str("<h2>Registra movimento</h2>\n<form class=\"movement\" method=\"post\" action=\"/movements\">\n");
    let _ = writeln!(
        out,
        r#"<input type="hidden" name="filter" value="{}">"#,
        escape(filter.as_param())
    );

    out.push_str("<label>Magazzino <select name=\"warehouse_id\" required>\n");
    option(out, "", "Seleziona...", form.warehouse_id.is_empty());
    for warehouse in warehouses {
        let id = warehouse.id.to_string();
        option(out, &id, &warehouse.name, form.warehouse_id == id);
    }
    out.push_str("</select></label>\n");

    out.push_str("<label>Annata <select name=\"year\">\n");
    for year in VINTAGES {
        let year_text = year.to_string();
        option(out, &year_text, &year_text, form.year == year);
    }
    out.push_str("</select></label>\n");

    out.push_str("<label>Lotto <select name=\"lot\">\n");
    for lot in Lot::ALL {
        option(out, lot.as_str(), lot.as_str(), form.lot == lot);
    }
    out.push_str("</select></label>\n");

    out.push_str("<label>Formato <select name=\"size\">\n");
    for size in PackageSize::ALL {
        let ml = size.ml_per_unit().to_string();
        let _ = writeln!(
            out,
            r#"<option value="{}" data-ml="{ml}"{}>{}</option>"#,
            size.code(),
            selected_attr(form.size == size),
            size.label()
        );
    }
    out.push_str("</select></label>\n");

    out.push_str("<label>Tipo <select name=\"kind\">\n");
    for kind in MovementKind::ALL {
        option(out, kind.code(), kind.label(), form.kind == kind);
    }
    out.push_str("</select></label>\n");

    let _ = write!(
        out,
        r#"<label>Unità <input type="number" name="units" min="1" step="1" value="{}"></label>
<label>Nota <input type="text" name="note" value="{}"></label>
<button type="submit" id="submit-movement">Registra (≈ {} ml)</button>
</form>
<script>
(function () {{
  var form = document.querySelector('form.movement');
  var button = document.getElementById('submit-movement');
  function update() {{
    var raw = form.units.value.trim();
    var units = raw === '' ? 1 : parseInt(raw, 10);
    var ml = Number(form.size.selectedOptions[0].dataset.ml);
    var total = units >= 1 ? units * ml : 0;
    button.textContent = 'Registra (≈ ' + total + ' ml)';
  }}
  form.addEventListener('input', update);
  form.addEventListener('change', update);
}})();
</script>
"#,
        escape(&form.units),
        escape(&form.note),
        form.preview_ml()
    );
}

fn option(out: &mut String, value: &str, label: &str, selected: bool) {
    let _ = writeln!(
        out,
        r#"<option value="{}"{}>{}</option>"#,
        escape(value),
        selected_attr(selected),
        escape(label)
    );
}

fn selected_attr(selected: bool) -> &'static str {
    if selected {
        " selected"
    } else {
        ""
    }
}
