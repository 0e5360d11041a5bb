use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};

use crate::controller::{Controller, TaskForm};
use crate::error::AppError;
use crate::models::{short_id, Priority, Task, TaskId};

fn priority_color(priority: Priority) -> Color {
    match priority {
        Priority::High => Color::Red,
        Priority::Normal => Color::Yellow,
        Priority::Low => Color::Green,
    }
}

/// Renders tasks as a table, newest first.
pub fn task_table(tasks: &[Task]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("ID").add_attribute(Attribute::Bold),
            Cell::new("Title").add_attribute(Attribute::Bold),
            Cell::new("Priority").add_attribute(Attribute::Bold),
            Cell::new("Due").add_attribute(Attribute::Bold),
            Cell::new("Created").add_attribute(Attribute::Bold),
            Cell::new("Status").add_attribute(Attribute::Bold),
        ]);

    for t in tasks {
        let status = if t.is_complete { "Done" } else { "Pending" };
        let status_color = if t.is_complete { Color::Green } else { Color::Yellow };
        let title = match &t.description {
            Some(d) => format!("{}\n{}", t.title, d),
            None => t.title.clone(),
        };
        table.add_row(vec![
            Cell::new(t.id.as_str()),
            Cell::new(title),
            Cell::new(t.priority).fg(priority_color(t.priority)),
            Cell::new(t.due_date.map(|d| d.to_string()).unwrap_or_default()),
            Cell::new(t.created_at.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M")),
            Cell::new(status).fg(status_color),
        ]);
    }
    table
}

/// Lists the current guest's tasks. Completed ones are hidden when `pending_only`.
pub async fn cmd_list(controller: &Controller, pending_only: bool) -> Result<(), AppError> {
    let user = controller.sign_in().await?;
    let mut tasks = controller.load(&user).await?;
    if pending_only {
        tasks.retain(|t| !t.is_complete);
    }
    if tasks.is_empty() {
        println!("No tasks yet.");
        return Ok(());
    }
    println!("{}", task_table(&tasks));
    Ok(())
}

/// Creates a task for the current guest.
pub async fn cmd_add(controller: &Controller, form: TaskForm) -> Result<(), AppError> {
    // Reject bad input before a guest account is provisioned for it.
    form.validate()?;
    let user = controller.sign_in().await?;
    controller.create(&user, &form).await?;
    println!("Task added.");
    Ok(())
}

/// Flips completion of one of the current guest's tasks.
pub async fn cmd_toggle(controller: &Controller, id: String) -> Result<(), AppError> {
    let user = controller.sign_in().await?;
    let id = TaskId(id);
    let tasks = controller.toggle(&user, &id).await?;
    match tasks.iter().find(|t| t.id == id) {
        Some(t) if t.is_complete => println!("Task {} marked as complete.", id),
        Some(_) => println!("Task {} marked as incomplete.", id),
        None => println!("Task {} updated.", id),
    }
    Ok(())
}

/// Drops the current guest and provisions a new one.
pub async fn cmd_new_guest(controller: &Controller) -> Result<(), AppError> {
    let user = controller.new_guest().await?;
    println!("New guest: {}", user);
    Ok(())
}

/// Prints the current guest.
pub async fn cmd_whoami(controller: &Controller) -> Result<(), AppError> {
    let user = controller.sign_in().await?;
    println!("Guest user: {} ({} mode)", short_id(user.as_str()), controller.mode().label());
    println!("{}", user);
    Ok(())
}
