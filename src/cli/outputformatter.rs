use terminal_size::{terminal_size, Height, Width};

use crate::staff::Staff;

const STAFF_COLUMNS: [&str; 7] = ["id", "name", "email", "role", "active", "can_login", "last_login"];

/// Print staff members as an ASCII table fitted to the terminal.
pub fn print_staff_table(staff: &[Staff]) {
    if staff.is_empty() {
        println!("no staff members");
        return;
    }
    let rows: Vec<Vec<String>> = staff.iter().map(staff_row).collect();
    for line in render_table(&STAFF_COLUMNS, &rows, get_terminal_width()) {
        println!("{}", line);
    }
    println!("rows: {}", rows.len());
}

fn staff_row(s: &Staff) -> Vec<String> {
    vec![
        s.id.to_string(),
        s.name.clone(),
        s.email.clone(),
        s.role.to_string(),
        s.is_active.to_string(),
        s.can_login.to_string(),
        s.last_login.map(|t| t.format("%Y-%m-%d %H:%M").to_string()).unwrap_or_else(|| "-".to_string()),
    ]
}

/// Render `rows` under `cols`, shrinking the widest columns until the table fits `max_width`.
pub fn render_table(cols: &[&str], rows: &[Vec<String>], max_width: usize) -> Vec<String> {
    let mut widths: Vec<usize> = cols.iter().map(|c| display_len(c)).collect();
    for r in rows {
        for (i, cell) in r.iter().enumerate().take(cols.len()) {
            widths[i] = widths[i].max(display_len(cell));
        }
    }
    // "| " + cell + " " per column, plus the closing '|'
    let overhead = 3 * cols.len() + 1;
    while widths.iter().sum::<usize>() + overhead > max_width {
        let Some((idx, w)) = widths.iter().copied().enumerate().max_by_key(|(_, w)| *w) else { break; };
        if w <= 4 { break; }
        widths[idx] -= 1;
    }

    let header: Vec<String> = cols.iter().map(|c| c.to_string()).collect();
    let sep = build_separator(&widths);
    let mut out = Vec::with_capacity(rows.len() + 4);
    out.push(sep.clone());
    out.push(build_row(&header, &widths));
    out.push(sep.clone());
    for r in rows {
        out.push(build_row(r, &widths));
    }
    out.push(sep);
    out
}

fn display_len(s: &str) -> usize { s.chars().count() }

fn build_separator(widths: &[usize]) -> String {
    let mut s = String::new();
    s.push('+');
    for w in widths {
        s.push_str(&"-".repeat(*w + 2));
        s.push('+');
    }
    s
}

fn build_row(cells: &[String], widths: &[usize]) -> String {
    let mut s = String::new();
    s.push('|');
    for (i, w) in widths.iter().enumerate() {
        let cell = cells.get(i).cloned().unwrap_or_default();
        let text = truncate(&cell, *w);
        s.push(' ');
        if is_numeric_like(&cell) {
            s.push_str(&" ".repeat(w.saturating_sub(display_len(&text))));
            s.push_str(&text);
        } else {
            s.push_str(&text);
            s.push_str(&" ".repeat(w.saturating_sub(display_len(&text))));
        }
        s.push(' ');
        s.push('|');
    }
    s
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max { return s.to_string(); }
    if max <= 1 { return "…".to_string(); }
    s.chars().take(max - 1).collect::<String>() + "…"
}

fn is_numeric_like(s: &str) -> bool {
    let st = s.trim();
    !st.is_empty() && st.chars().all(|c| c.is_ascii_digit())
}

fn get_terminal_width() -> usize {
    if let Some((Width(w), Height(_h))) = terminal_size() {
        return (w as usize).saturating_sub(4).max(40);
    }
    120
}
