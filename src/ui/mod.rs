mod gpu;
mod views;

use std::{path::PathBuf, sync::Arc, time::Instant};

use egui_winit::State as EguiWinitState;
use skillsync::{
    api::{Credentials, Registration},
    composer::FileCandidate,
    model::Role,
    runtime::Runtime,
    Messenger,
};
use uuid::Uuid;
use winit::{
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::EventLoop,
    window::{Window, WindowBuilder},
};

pub use gpu::GpuError;

/// What the user asked for during a frame. Applied after rendering.
#[derive(Debug, Clone)]
pub enum Intent {
    Login,
    Register,
    ToggleRegister,
    Logout,
    OpenMessages,
    RefreshThreads,
    Search(String),
    Select(i64),
    LoadOlder,
    Draft(String),
    Attach,
    Unstage(Uuid),
    Send,
    Retry(Uuid),
    Discard(Uuid),
    DismissToast(u64),
}

/// Form fields that only live in the window.
pub struct FormState {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub role: Role,
    pub registering: bool,
    pub search: String,
    pub draft: String,
    pub attach_path: String,
}

impl Default for FormState {
    fn default() -> Self {
        Self {
            email: String::new(),
            password: String::new(),
            full_name: String::new(),
            role: Role::Client,
            registering: false,
            search: String::new(),
            draft: String::new(),
            attach_path: String::new(),
        }
    }
}

pub struct Shell {
    window: Arc<Window>,
    gpu: gpu::Gpu,
    egui_state: EguiWinitState,
    egui_ctx: egui::Context,
    messenger: Messenger,
    runtime: Runtime,
    form: FormState,
}

#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    #[error("cannot open window: {0}")]
    Window(#[from] winit::error::OsError),
    #[error(transparent)]
    Gpu(#[from] GpuError),
}

impl Shell {
    pub fn new(
        event_loop: &EventLoop<()>,
        messenger: Messenger,
        runtime: Runtime,
    ) -> Result<Self, ShellError> {
        let window = Arc::new(
            WindowBuilder::new()
                .with_title("SkillSync")
                .with_inner_size(PhysicalSize::new(1100, 720))
                .build(event_loop)?,
        );
        let gpu = gpu::Gpu::new(Arc::clone(&window))?;
        let egui_ctx = egui::Context::default();
        let egui_state = EguiWinitState::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            window.as_ref(),
            None,
            None,
        );
        Ok(Self {
            window,
            gpu,
            egui_state,
            egui_ctx,
            messenger,
            runtime,
            form: FormState::default(),
        })
    }

    pub fn window_id(&self) -> winit::window::WindowId {
        self.window.id()
    }

    pub fn request_redraw(&self) {
        self.window.request_redraw();
    }

    pub fn resize(&mut self, size: PhysicalSize<u32>) {
        self.gpu.resize(size);
    }

    pub fn rescale(&mut self) {
        let size = self.window.inner_size();
        self.gpu.resize(size);
    }

    pub fn on_window_event(&mut self, event: &WindowEvent) {
        let _ = self.egui_state.on_window_event(self.window.as_ref(), event);
    }

    pub fn render(&mut self) {
        let now = Instant::now();
        self.runtime.pump(&mut self.messenger, now);
        self.form.draft = self.messenger.composer().draft().to_string();

        let raw_input = self.egui_state.take_egui_input(self.window.as_ref());
        let mut intents: Vec<Intent> = Vec::new();
        let output = self.egui_ctx.run(raw_input, |ctx| {
            views::render(
                ctx,
                &self.messenger,
                self.runtime.location(),
                &mut self.form,
                now,
                &mut intents,
            );
        });
        self.egui_state
            .handle_platform_output(self.window.as_ref(), output.platform_output.clone());
        self.gpu.paint(&self.egui_ctx, output);

        for intent in intents {
            self.apply(intent, now);
        }
        let effects = self.messenger.drain_effects();
        self.runtime.apply(effects);
    }

    fn apply(&mut self, intent: Intent, now: Instant) {
        match intent {
            Intent::Login => self.messenger.login(Credentials {
                username: self.form.email.trim().to_string(),
                password: self.form.password.clone(),
            }),
            Intent::Register => self.messenger.register(Registration {
                email: self.form.email.trim().to_string(),
                password: self.form.password.clone(),
                full_name: self.form.full_name.trim().to_string(),
                role: self.form.role,
            }),
            Intent::ToggleRegister => self.form.registering = !self.form.registering,
            Intent::Logout => {
                self.messenger.logout();
                self.form = FormState::default();
            }
            Intent::OpenMessages => self.messenger.open_messages(),
            Intent::RefreshThreads => self.messenger.refresh_threads(),
            Intent::Search(query) => self.messenger.set_search(query),
            Intent::Select(peer_id) => self.messenger.select_thread(peer_id),
            Intent::LoadOlder => self.messenger.load_older(),
            Intent::Draft(text) => self.messenger.edit_draft(text),
            Intent::Attach => {
                let batch: Vec<FileCandidate> = self
                    .form
                    .attach_path
                    .split(';')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(|p| FileCandidate::from_path(PathBuf::from(p)))
                    .collect();
                if !batch.is_empty() {
                    self.messenger.stage_files(batch, now);
                    self.form.attach_path.clear();
                }
            }
            Intent::Unstage(id) => self.messenger.unstage(id),
            Intent::Send => {
                self.messenger.send();
            }
            Intent::Retry(id) => self.messenger.retry(id),
            Intent::Discard(id) => self.messenger.discard(id),
            Intent::DismissToast(id) => self.messenger.dismiss_toast(id),
        }
    }
}
