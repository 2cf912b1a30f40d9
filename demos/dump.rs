//! Loads every settings panel from a ground station and prints it.
//!
//! cargo run --example dump -- [groundlink.toml] [ROLE OUTPUT BUTTON]
//!
//! With a role, output and button the demo also tries to stage that binding
//! (nothing is saved) and prints the permitted buttons if it is refused.

use groundlink::{
    ClientConfig, DomainName, FilteredListener, LogListener, MappingKind, NoticeFilter,
    NoticeQueue, RawEdit, Session,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => ClientConfig::load(path)?,
        None => ClientConfig::default(),
    };
    let trial: Vec<String> = args.take(3).collect();
    println!("Ground station: {}", config.base_url);

    let mut session = Session::connect(&config)?;
    session
        .notices_mut()
        .add_listener(LogListener::new(), NoticeFilter::ProblemsOnly, None);
    let hints = NoticeQueue::new();
    session.notices_mut().add_listener(
        FilteredListener::whitelist_hints(hints.clone()),
        NoticeFilter::All,
        Some(DomainName::Controls.as_str().to_string()),
    );

    let loaded = session.load(None).await;
    for (name, ok) in &loaded {
        println!("{:>20}: {}", name.as_str(), if *ok { "loaded" } else { "FAILED" });
    }

    if loaded[&DomainName::Controls] {
        let controls = session.controls();
        for role in controls.roles() {
            println!("== {role} ==");
            for kind in [MappingKind::Button, MappingKind::Axis] {
                for row in controls.rows(role.as_str(), kind) {
                    let marker = if row.is_enum { "*" } else { " " };
                    println!("  {marker} {:<24} {}", row.output, row.display);
                }
            }
        }

        if let [role, output, button] = trial.as_slice() {
            match session.edit_control(role, output, MappingKind::Button, RawEdit::button(button)) {
                Ok(()) => println!("{role}/{output} = {button} would be accepted"),
                Err(rejection) => println!("{role}/{output} = {button}: {rejection}"),
            }
            for notice in hints.drain() {
                for combo in notice.allowed.unwrap_or_default() {
                    println!("  allowed: {}", combo.join(" + "));
                }
            }
            session.controls_mut().discard_all();
        }
    }

    if let Some(radio) = session.radio().resolved() {
        println!(
            "radio: channel {} pa {} feedback {}",
            radio.channel, radio.pa_level, radio.feedback
        );
    }
    for surface in session.trim().surfaces() {
        println!(
            "{surface:<12} trim {:>4}  max {:>3}",
            session.trim().resolved(surface).unwrap_or(0),
            session.max_surface_angles().resolved(surface).unwrap_or(0)
        );
    }
    if session.serial_port().in_use() {
        println!(
            "serial: {} @ {}",
            session.serial_port().resolved_port().unwrap_or("-"),
            session.serial_port().resolved_baud_rate().unwrap_or(0)
        );
    }
    Ok(())
}
