use crate::app::state::App;
use crossterm::event::KeyCode;

pub async fn handle_input(app: &mut App, key: KeyCode) {
    if handle_help_toggle(app, key) {
        return;
    }

    match key {
        KeyCode::Char('q') => app.running = false,
        KeyCode::Char(' ') => app.toggle_pause(),
        KeyCode::Char('c') => app.clear(),
        KeyCode::Char('d') => app.show_demo(),
        KeyCode::Char('r') => {
            if let Err(e) = app.reload().await {
                log::error!("Reload failed: {e}");
                app.status_message = format!("Error: {e}");
            }
        }
        KeyCode::Char('s') => {
            if let Err(e) = app.save_snapshot().await {
                log::error!("Snapshot failed: {e}");
                app.status_message = format!("Error: {e}");
            }
        }
        KeyCode::Right | KeyCode::Tab => app.hover_next(),
        KeyCode::Left | KeyCode::BackTab => app.hover_prev(),
        KeyCode::Esc => app.clear_hover(),
        _ => {}
    }
}

fn handle_help_toggle(app: &mut App, key: KeyCode) -> bool {
    if key == KeyCode::F(1) || key == KeyCode::Char('?') {
        app.show_help = !app.show_help;
        return true;
    }

    if app.show_help {
        if key == KeyCode::Esc {
            app.show_help = false;
        }
        return true;
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use tradeflow::{FlowMap, MapOptions};

    fn app() -> App {
        let mut map = FlowMap::new(MapOptions::default());
        map.initialize().unwrap();
        App::new(map)
    }

    #[tokio::test]
    async fn keys_drive_the_map() {
        let mut app = app();

        handle_input(&mut app, KeyCode::Char('d')).await;
        assert_eq!(app.map.flows().len(), 5);

        handle_input(&mut app, KeyCode::Char(' ')).await;
        assert!(app.paused);

        handle_input(&mut app, KeyCode::Char('c')).await;
        assert!(app.map.flows().is_empty());

        handle_input(&mut app, KeyCode::Right).await;
        assert!(app.hovered().is_some());
        handle_input(&mut app, KeyCode::Esc).await;
        assert!(app.hovered().is_none());

        handle_input(&mut app, KeyCode::Char('q')).await;
        assert!(!app.running);
    }

    #[tokio::test]
    async fn help_swallows_keys_until_closed() {
        let mut app = app();

        handle_input(&mut app, KeyCode::F(1)).await;
        handle_input(&mut app, KeyCode::Char('q')).await;
        assert!(app.running);

        handle_input(&mut app, KeyCode::Esc).await;
        assert!(!app.show_help);
    }
}
