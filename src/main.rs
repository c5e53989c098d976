mod ui;

use std::{error::Error, sync::Arc};

use skillsync::{
    api::ApiClient, config::ClientConfig, route::Route, runtime::Runtime, session::SessionStore,
    Messenger,
};
use winit::{
    event::{Event, WindowEvent},
    event_loop::EventLoop,
};

use crate::ui::Shell;

/// `--route "/messages?user=42"` opens straight into a deep link once signed in.
fn requested_route() -> Option<Route> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        let value = match arg.strip_prefix("--route=") {
            Some(value) => value.to_string(),
            None if arg == "--route" => args.next()?,
            None => continue,
        };
        match Route::parse(&value) {
            Some(route) => return Some(route),
            None => log::warn!("ignoring unknown route {value:?}"),
        }
    }
    None
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("skillsync: booting");

    let config = ClientConfig::from_env()?;
    log::info!("[Api] backend {}, realtime {}", config.api_url, config.ws_url);
    let store = SessionStore::open_or_memory(&config.db_path)?;
    let backend = Arc::new(ApiClient::from_config(&config));
    let mut messenger = Messenger::new(config.page_size);
    let mut runtime = Runtime::new(config, backend, store);

    if let Some(route) = requested_route() {
        messenger.request_route(route);
    }
    runtime.start(&mut messenger)?;

    let event_loop = EventLoop::new()?;
    let mut shell = Shell::new(&event_loop, messenger, runtime)?;

    event_loop.run(move |event, elwt| match event {
        Event::WindowEvent { event, window_id } if window_id == shell.window_id() => match event {
            WindowEvent::RedrawRequested => shell.render(),
            WindowEvent::CloseRequested => elwt.exit(),
            WindowEvent::Resized(size) => shell.resize(size),
            WindowEvent::ScaleFactorChanged { .. } => shell.rescale(),
            _ => shell.on_window_event(&event),
        },
        Event::AboutToWait => shell.request_redraw(),
        _ => {}
    })?;
    Ok(())
}
