//! Report rows to [`TableReport`]s.

use chrono::{DateTime, Month, NaiveDate, Utc};

use techstore_core::{
    sale_kind_label, DailySalesRow, InventoryByCategoryRow, Money, MonthlySalesRow,
    OutstandingCreditRow, OverdueClientRow, SalesByTypeRow, SessionLogEntryRow, VatQuarterSummary,
};

use super::TableReport;

fn money(cents: i64) -> String {
    Money::from_cents(cents).to_string()
}

fn timestamp(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// "All dates", "From 2024-01-01", "Until 2024-01-31" or "2024-01-01 to 2024-01-31".
pub fn range_label(from: Option<NaiveDate>, to: Option<NaiveDate>) -> String {
    match (from, to) {
        (None, None) => "All dates".to_string(),
        (Some(from), None) => format!("From {from}"),
        (None, Some(to)) => format!("Until {to}"),
        (Some(from), Some(to)) => format!("{from} to {to}"),
    }
}

pub fn month_label(month: u32, year: i32) -> String {
    match u8::try_from(month).ok().and_then(|m| Month::try_from(m).ok()) {
        Some(m) => format!("{} {}", m.name(), year),
        None => format!("{month}/{year}"),
    }
}

pub fn daily_sales(rows: &[DailySalesRow], from: Option<NaiveDate>, to: Option<NaiveDate>) -> TableReport {
    let mut table = TableReport::new("Daily Sales Summary", ["Day", "Sales", "Total"])
        .subtitle(range_label(from, to));

    let mut count = 0;
    let mut total = 0;
    for row in rows {
        count += row.sale_count;
        total += row.total_cents;
        table.push_row(vec![row.day.clone(), row.sale_count.to_string(), money(row.total_cents)]);
    }

    table.footer(format!("TOTAL: {} ({} sales)", money(total), count))
}

pub fn outstanding_credits(rows: &[OutstandingCreditRow]) -> TableReport {
    let mut table = TableReport::new(
        "Outstanding Credits",
        ["Credit", "Sale", "Client", "Total", "Remaining", "Due date", "Status"],
    );

    let mut owed = 0;
    for row in rows {
        owed += row.remaining_balance_cents;
        table.push_row(vec![
            row.credit_id.to_string(),
            row.sale_id.to_string(),
            row.client_name.clone(),
            money(row.total_balance_cents),
            money(row.remaining_balance_cents),
            row.due_date.to_string(),
            row.status.as_str().to_uppercase(),
        ]);
    }

    table.footer(format!("TOTAL OWED: {}", money(owed)))
}

pub fn session_log(rows: &[SessionLogEntryRow], limit: u32) -> TableReport {
    let mut table = TableReport::new("Session Log", ["#", "User", "Login", "Logout", "Origin", "Note"])
        .subtitle(format!("Latest {limit} sessions"));

    for row in rows {
        table.push_row(vec![
            row.id.to_string(),
            row.username.clone(),
            timestamp(&row.login_at),
            row.logout_at.as_ref().map(timestamp).unwrap_or_else(|| "-".to_string()),
            row.origin.clone(),
            row.note.clone(),
        ]);
    }

    table
}

pub fn monthly_sales(rows: &[MonthlySalesRow], month: u32, year: i32) -> TableReport {
    let mut table = TableReport::new("Monthly Sales", ["Sale", "Date", "Client", "Type", "Total"])
        .subtitle(month_label(month, year));

    let mut total = 0;
    for row in rows {
        total += row.total_cents;
        table.push_row(vec![
            row.sale_id.to_string(),
            timestamp(&row.sold_at),
            row.client_name.clone(),
            sale_kind_label(row.is_credit).to_string(),
            money(row.total_cents),
        ]);
    }

    table.footer(format!("TOTAL: {} ({} sales)", money(total), rows.len()))
}

pub fn vat_quarter(summary: &VatQuarterSummary) -> TableReport {
    let rate = format!("{}.{:02}%", summary.vat_rate_bps / 100, summary.vat_rate_bps % 100);
    let mut table = TableReport::new("VAT by Quarter", ["Concept", "Value"])
        .subtitle(format!("Q{} {}", summary.quarter, summary.year));

    table.push_row(vec!["Sales".into(), summary.sale_count.to_string()]);
    table.push_row(vec!["Gross (VAT included)".into(), money(summary.gross_cents)]);
    table.push_row(vec![format!("VAT ({rate})"), money(summary.vat_cents)]);
    table.push_row(vec!["Net".into(), money(summary.net_cents)]);

    table
}

pub fn sales_by_type(rows: &[SalesByTypeRow], from: Option<NaiveDate>, to: Option<NaiveDate>) -> TableReport {
    let mut table = TableReport::new("Credit vs Cash Sales", ["Type", "Sales", "Total"])
        .subtitle(range_label(from, to));

    let mut total = 0;
    for row in rows {
        total += row.total_cents;
        table.push_row(vec![
            sale_kind_label(row.is_credit).to_string(),
            row.sale_count.to_string(),
            money(row.total_cents),
        ]);
    }

    table.footer(format!("TOTAL: {}", money(total)))
}

pub fn inventory_by_category(rows: &[InventoryByCategoryRow]) -> TableReport {
    let mut table = TableReport::new(
        "Inventory by Category",
        ["Category", "Products", "Units", "Stock value"],
    )
    .subtitle("Stock valued at purchase price");

    let mut value = 0;
    for row in rows {
        value += row.stock_value_cents;
        table.push_row(vec![
            row.category_name.clone(),
            row.product_count.to_string(),
            row.total_units.to_string(),
            money(row.stock_value_cents),
        ]);
    }

    table.footer(format!("TOTAL STOCK VALUE: {}", money(value)))
}

pub fn overdue_clients(rows: &[OverdueClientRow], today: NaiveDate) -> TableReport {
    let mut table = TableReport::new(
        "Clients in Arrears",
        ["Client", "Document", "Credits", "Owed", "Oldest due"],
    )
    .subtitle(format!("As of {today}"));

    for row in rows {
        table.push_row(vec![
            row.client_name.clone(),
            row.document.clone().unwrap_or_default(),
            row.credit_count.to_string(),
            money(row.remaining_cents),
            row.oldest_due_date.to_string(),
        ]);
    }

    table
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_range_labels() {
        assert_eq!(range_label(None, None), "All dates");
        assert_eq!(range_label(Some(date(2024, 1, 1)), None), "From 2024-01-01");
        assert_eq!(
            range_label(Some(date(2024, 1, 1)), Some(date(2024, 1, 31))),
            "2024-01-01 to 2024-01-31"
        );
        assert_eq!(month_label(3, 2024), "March 2024");
    }

    #[test]
    fn test_daily_sales_footer_sums_rows() {
        let rows = vec![
            DailySalesRow { day: "2024-03-01".into(), sale_count: 2, total_cents: 150_000 },
            DailySalesRow { day: "2024-03-02".into(), sale_count: 1, total_cents: 999 },
        ];
        let table = daily_sales(&rows, None, None);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0], vec!["2024-03-01", "2", "$1,500.00"]);
        assert_eq!(table.footer.as_deref(), Some("TOTAL: $1,509.99 (3 sales)"));
    }

    #[test]
    fn test_vat_quarter_rows() {
        let summary = VatQuarterSummary::from_gross(2024, 1, 1500, 3, Money::from_cents(11_500));
        let table = vat_quarter(&summary);
        assert_eq!(table.subtitle.as_deref(), Some("Q1 2024"));
        assert_eq!(table.rows[2], vec!["VAT (15.00%)", "$15.00"]);
        assert_eq!(table.rows[3], vec!["Net", "$100.00"]);
    }
}
