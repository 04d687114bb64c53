//! Subcommand bodies. Everything prints to stdout; logs go to stderr.

use anyhow::{Context, Result, bail};
use atril_core::search::{checkout_candidates, loaned_students};
use atril_core::student::search_students;
use atril_core::{
    CheckoutMode, ConditionCategory, InventoryRecord, InventoryStats, MonthlyReport,
    MovementRecord, MovementStatus, StudentEntry, ViewFilter, filter,
};
use atril_ingest::{ReconcileOptions, read_sheet, write_inventory_csv};
use atril_sync::{CheckoutInput, ClearOutcome, ReturnInput, Session, Store};
use chrono::Utc;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

pub async fn import<S: Store>(session: &mut Session<S>, file: &Path, infer_family: bool) -> Result<()> {
    let rows = read_sheet(file).with_context(|| format!("reading {}", file.display()))?;
    info!(rows = rows.len(), file = %file.display(), "read sheet");

    match session
        .import_rows(&rows, ReconcileOptions { infer_family })
        .await
    {
        Ok(report) => {
            println!(
                "Imported {} instruments ({} students) from {}",
                report.instruments,
                report.students,
                file.display()
            );
            if !report.students_synced {
                println!("Warning: the student directory could not be updated in the store.");
            }
            Ok(())
        }
        Err(e) => {
            if e.remote_inventory_empty() {
                eprintln!("The store now has no inventory. Run the import again once it is reachable.");
            }
            Err(e).context("import failed")
        }
    }
}

pub fn view_filter(
    monitor: Option<String>,
    loaned: bool,
    condition: Option<ConditionCategory>,
) -> ViewFilter {
    match (monitor, loaned, condition) {
        (Some(name), _, _) => ViewFilter::Monitor(name),
        (None, true, _) => ViewFilter::Loaned,
        (None, false, Some(category)) => ViewFilter::Condition(category),
        (None, false, None) => ViewFilter::All,
    }
}

fn cell(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("-")
}

fn print_record(r: &InventoryRecord) {
    let holder = if r.is_loaned() {
        format!("-> {}", r.student.as_deref().unwrap_or("?"))
    } else {
        String::new()
    };
    println!(
        "{:>4}  {:<24} {:<12} {:<10} {:<8} {:<14} {}",
        r.id,
        r.instrument_name(),
        cell(&r.brand),
        cell(&r.serial),
        r.condition_category().label(),
        cell(&r.monitor),
        holder
    );
}

pub fn list<S: Store>(session: &Session<S>, term: &str, view: &ViewFilter) {
    let found = filter(session.inventory(), term, view);
    for r in &found {
        print_record(r);
    }
    println!("\n{} of {} instruments", found.len(), session.inventory().len());
}

fn print_stats(stats: &InventoryStats) {
    println!("Instruments:   {}", stats.total);
    println!("On loan:       {}", stats.loaned);
    for category in ConditionCategory::ALL {
        println!("{:<14} {}", format!("{}:", category.label()), stats.count(category));
    }
    println!("Need repair:   {}", stats.needs_repair());
}

pub fn stats<S: Store>(session: &Session<S>) {
    let stats = InventoryStats::compute(session.inventory());
    print_stats(&stats);

    println!("\nBy family:");
    for (family, n) in &stats.by_family {
        println!("  {family:<28} {n}");
    }
    println!("\nBy monitor:");
    for (monitor, n) in &stats.by_monitor {
        println!("  {monitor:<28} {n}");
    }
}

pub async fn checkout<S: Store>(
    session: &mut Session<S>,
    id: String,
    student: String,
    course: Option<String>,
    date: Option<String>,
) -> Result<()> {
    let input = CheckoutInput {
        instrument_id: id.clone(),
        student,
        course,
        date,
    };
    match session.check_out(input, Utc::now()).await {
        Ok(out) => {
            let m = &out.movement;
            println!(
                "{} ({}) checked out to {} [{}] on {} {}",
                m.instrument_name, m.instrument_id, m.student, m.course, m.checkout_date, m.checkout_time
            );
            Ok(())
        }
        Err(e) => {
            suggest_candidates(session.inventory(), &id, CheckoutMode::Out);
            Err(e).with_context(|| format!("checking out instrument {id}"))
        }
    }
}

pub async fn give_back<S: Store>(
    session: &mut Session<S>,
    id: String,
    student: String,
    date: Option<String>,
) -> Result<()> {
    let input = ReturnInput {
        instrument_id: id.clone(),
        student,
        date,
    };
    match session.check_in(input, Utc::now()).await {
        Ok(out) => {
            match &out.completed {
                Some(m) => println!(
                    "{} ({}) returned by {} on {}",
                    m.instrument_name,
                    m.instrument_id,
                    m.student,
                    m.return_date.as_deref().unwrap_or_default()
                ),
                None => println!("Instrument {id} returned (no open movement on record)"),
            }
            Ok(())
        }
        Err(e) => {
            suggest_candidates(session.inventory(), &id, CheckoutMode::In);
            Err(e).with_context(|| format!("returning instrument {id}"))
        }
    }
}

/// When the id matches nothing, treat it as a search term and show what it
/// could have meant.
fn suggest_candidates(inventory: &[InventoryRecord], id: &str, mode: CheckoutMode) {
    if inventory.iter().any(|r| r.id == id) {
        return;
    }
    let candidates = checkout_candidates(inventory, id, mode);
    if candidates.is_empty() {
        return;
    }
    eprintln!("Did you mean:");
    for r in candidates {
        eprintln!("  {:>4}  {} {}", r.id, r.instrument_name(), cell(&r.serial));
    }
}

fn print_student(s: &StudentEntry) {
    println!(
        "{:>4}  {:<30} {:<12} {:<14} {}",
        s.id,
        s.name,
        s.course,
        s.instrument.as_deref().unwrap_or("-"),
        s.phone.as_deref().unwrap_or("")
    );
}

pub fn list_students<S: Store>(session: &Session<S>, term: &str, loaned: bool) {
    let students: Vec<&StudentEntry> = if loaned {
        loaned_students(session.inventory(), session.students())
    } else {
        search_students(session.students(), term)
    };
    for s in &students {
        print_student(s);
    }
    println!("\n{} students", students.len());
}

/// Add (no id) or update a student. Options left out on update keep their
/// stored values.
pub async fn save_student<S: Store>(
    session: &mut Session<S>,
    id: Option<String>,
    mut entry: StudentEntry,
) -> Result<()> {
    if let Some(id) = id {
        let Some(existing) = session.students().iter().find(|s| s.id == id) else {
            bail!("no student with id {id}");
        };
        if entry.course.trim().is_empty() {
            entry.course = existing.course.clone();
        }
        entry.instrument = entry.instrument.or_else(|| existing.instrument.clone());
        entry.phone = entry.phone.or_else(|| existing.phone.clone());
        entry.email = entry.email.or_else(|| existing.email.clone());
        entry.parent_name = entry.parent_name.or_else(|| existing.parent_name.clone());
        entry.parent_phone = entry.parent_phone.or_else(|| existing.parent_phone.clone());
        entry.id = id;
    }
    let name = entry.name.clone();
    session
        .save_student(entry)
        .await
        .with_context(|| format!("saving student {name}"))?;
    println!("Saved {}", name.trim().to_uppercase());
    Ok(())
}

fn print_movement(m: &MovementRecord) {
    let status = match m.status {
        MovementStatus::CheckedOut => "EN PRÉSTAMO".to_string(),
        MovementStatus::Completed => {
            format!("DEVUELTO {}", m.return_date.as_deref().unwrap_or_default())
        }
    };
    println!(
        "{} {}  {:<24} {:<10} {:<28} {:<10} {}",
        m.checkout_date, m.checkout_time, m.instrument_name, m.serial, m.student, m.course, status
    );
}

pub fn history<S: Store>(session: &Session<S>, status: Option<MovementStatus>) {
    let shown: Vec<&MovementRecord> = session
        .history()
        .iter()
        .filter(|m| status.is_none_or(|s| m.status == s))
        .collect();
    for m in &shown {
        print_movement(m);
    }
    println!("\n{} movements", shown.len());
}

pub fn monthly_report<S: Store>(
    session: &Session<S>,
    month: u32,
    year: i32,
    status: Option<MovementStatus>,
    save: Option<PathBuf>,
) -> Result<()> {
    let report = MonthlyReport::build(session.history(), month, year, status);
    println!("{} {}", report.month_name(), report.year);
    println!(
        "Checkouts: {}  Returned: {}  Pending: {}\n",
        report.checkouts, report.completed, report.pending
    );
    for m in &report.movements {
        print_movement(m);
    }

    if let Some(dir) = save {
        let path = dir.join(format!("{}.csv", report.file_stem()));
        write_report_csv(&report, &path)?;
        println!("\nWrote {}", path.display());
    }
    Ok(())
}

fn write_report_csv(report: &MonthlyReport<'_>, path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut wtr = csv::Writer::from_writer(file);
    wtr.write_record([
        "Fecha", "Hora", "Instrumento", "Serie", "Marca", "Estudiante", "Curso", "Estado",
        "Retorno",
    ])?;
    for m in &report.movements {
        let status = match m.status {
            MovementStatus::CheckedOut => "EN PRÉSTAMO",
            MovementStatus::Completed => "DEVUELTO",
        };
        wtr.write_record([
            m.checkout_date.as_str(),
            m.checkout_time.as_str(),
            m.instrument_name.as_str(),
            m.serial.as_str(),
            m.brand.as_str(),
            m.student.as_str(),
            m.course.as_str(),
            status,
            m.return_date.as_deref().unwrap_or_default(),
        ])
        .context("writing movement")?;
    }
    wtr.flush().with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

pub fn export<S: Store>(session: &Session<S>, out: &Path) -> Result<()> {
    let file = File::create(out).with_context(|| format!("create {}", out.display()))?;
    write_inventory_csv(session.inventory(), file)
        .with_context(|| format!("exporting to {}", out.display()))?;
    println!("Exported {} instruments to {}", session.inventory().len(), out.display());
    Ok(())
}

pub fn confirm(yes: bool, command: &str) -> Result<()> {
    if !yes {
        bail!("this deletes data for everyone using the store; rerun as `atril {command} --yes`");
    }
    Ok(())
}

pub async fn clear_history<S: Store>(session: &mut Session<S>) -> Result<()> {
    match session.clear_history().await.context("clearing history")? {
        ClearOutcome::Cleared => println!("History cleared."),
        ClearOutcome::TimedOut => println!(
            "The store did not answer in time; the history may or may not have been deleted."
        ),
    }
    Ok(())
}

pub async fn watch<S: Store>(session: &mut Session<S>, every: Duration) -> Result<()> {
    let mut ticker = tokio::time::interval(every);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                session.refresh().await;
                println!("--- {}", Utc::now().format("%Y-%m-%d %H:%M:%S UTC"));
                print_stats(&InventoryStats::compute(session.inventory()));
            }
            res = tokio::signal::ctrl_c() => {
                res.context("waiting for ctrl-c")?;
                break;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_filter_precedence() {
        assert_eq!(view_filter(None, false, None), ViewFilter::All);
        assert_eq!(view_filter(None, true, None), ViewFilter::Loaned);
        assert_eq!(
            view_filter(None, false, Some(ConditionCategory::Poor)),
            ViewFilter::Condition(ConditionCategory::Poor)
        );
        assert_eq!(
            view_filter(Some("Marta".into()), false, None),
            ViewFilter::Monitor("Marta".into())
        );
    }

    #[test]
    fn test_confirm_requires_flag() {
        assert!(confirm(false, "clear-history").is_err());
        assert!(confirm(true, "clear-history").is_ok());
    }
}
