use std::time::Instant;

use egui::{Align, Align2, Color32, Layout, RichText};
use skillsync::{
    conversation::Phase,
    error::human_size,
    model::{AttachmentKind, DeliveryStatus, Message, Role, Thread},
    notify::ToastKind,
    route::Route,
    Messenger,
};

use super::{FormState, Intent};

const MUTED: Color32 = Color32::from_rgb(110, 118, 135);
const ACCENT: Color32 = Color32::from_rgb(37, 99, 235);
const OWN_BUBBLE: Color32 = Color32::from_rgb(219, 234, 254);
const PEER_BUBBLE: Color32 = Color32::from_rgb(241, 245, 249);
const DANGER: Color32 = Color32::from_rgb(220, 38, 38);

pub fn render(
    ctx: &egui::Context,
    messenger: &Messenger,
    location: Route,
    form: &mut FormState,
    now: Instant,
    intents: &mut Vec<Intent>,
) {
    match location {
        Route::Login => login_view(ctx, messenger, form, intents),
        Route::Dashboard | Route::FindWork => home_view(ctx, messenger, location, intents),
        Route::Messages { .. } => messages_view(ctx, messenger, form, now, intents),
    }
    toasts(ctx, messenger, intents);
}

fn login_view(
    ctx: &egui::Context,
    messenger: &Messenger,
    form: &mut FormState,
    intents: &mut Vec<Intent>,
) {
    egui::CentralPanel::default().show(ctx, |ui| {
        ui.vertical_centered(|ui| {
            ui.add_space(80.0);
            ui.heading("SkillSync");
            ui.label(RichText::new(if form.registering {
                "Create your account"
            } else {
                "Sign in to continue"
            })
            .color(MUTED));
            ui.add_space(16.0);
            if form.registering {
                ui.add(egui::TextEdit::singleline(&mut form.full_name).hint_text("Full name"));
            }
            ui.add(egui::TextEdit::singleline(&mut form.email).hint_text("Email"));
            let password = ui.add(
                egui::TextEdit::singleline(&mut form.password)
                    .hint_text("Password")
                    .password(true),
            );
            if form.registering {
                ui.horizontal(|row| {
                    row.label("I am a");
                    row.radio_value(&mut form.role, Role::Client, "Client");
                    row.radio_value(&mut form.role, Role::Freelancer, "Freelancer");
                });
            }
            ui.add_space(8.0);
            if let Some(error) = messenger.auth_error() {
                ui.label(RichText::new(error).color(DANGER));
            }
            if messenger.auth_busy() {
                ui.spinner();
            } else {
                let submit_label = if form.registering { "Create account" } else { "Sign in" };
                let submitted = ui.button(submit_label).clicked()
                    || (password.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)));
                if submitted {
                    intents.push(if form.registering {
                        Intent::Register
                    } else {
                        Intent::Login
                    });
                }
                let toggle = if form.registering {
                    "Already have an account? Sign in"
                } else {
                    "New here? Create an account"
                };
                if ui.link(toggle).clicked() {
                    intents.push(Intent::ToggleRegister);
                }
            }
        });
    });
}

fn header(ui: &mut egui::Ui, messenger: &Messenger, intents: &mut Vec<Intent>) {
    ui.horizontal(|row| {
        row.heading("SkillSync");
        if let Some(session) = messenger.session() {
            row.label(RichText::new(format!("{} ({})", session.display_name, session.role.as_str())).color(MUTED));
        }
        row.with_layout(Layout::right_to_left(Align::Center), |row| {
            if row.button("Log out").clicked() {
                intents.push(Intent::Logout);
            }
            row.label(
                RichText::new(messenger.connection().label())
                    .small()
                    .color(MUTED),
            );
        });
    });
}

fn home_view(ctx: &egui::Context, messenger: &Messenger, location: Route, intents: &mut Vec<Intent>) {
    egui::TopBottomPanel::top("header").show(ctx, |ui| header(ui, messenger, intents));
    egui::CentralPanel::default().show(ctx, |ui| {
        let title = match location {
            Route::FindWork => "Find work",
            _ => "Dashboard",
        };
        ui.heading(title);
        ui.add_space(8.0);
        let unread = messenger.unread_total();
        let label = if unread > 0 {
            format!("Messages ({unread} unread)")
        } else {
            "Messages".to_string()
        };
        if ui.button(label).clicked() {
            intents.push(Intent::OpenMessages);
        }
    });
}

fn thread_row(ui: &mut egui::Ui, thread: &Thread, active: bool, intents: &mut Vec<Intent>) {
    let mut title = thread.peer_name.clone();
    if thread.unread_count > 0 {
        title.push_str(&format!("  ({})", thread.unread_count));
    }
    let text = if thread.unread_count > 0 {
        RichText::new(title).strong()
    } else {
        RichText::new(title)
    };
    if ui.selectable_label(active, text).clicked() {
        intents.push(Intent::Select(thread.peer_id));
    }
    if let Some(job) = &thread.job_title {
        ui.label(RichText::new(job).small().color(ACCENT));
    }
    if !thread.last_message.is_empty() {
        let mut preview: String = thread.last_message.chars().take(48).collect();
        if thread.last_message.chars().count() > 48 {
            preview.push('…');
        }
        ui.label(RichText::new(preview).small().color(MUTED));
    }
    ui.add_space(6.0);
}

fn bubble(ui: &mut egui::Ui, message: &Message, peer_name: &str, intents: &mut Vec<Intent>) {
    let layout = if message.is_own_message {
        Layout::right_to_left(Align::TOP)
    } else {
        Layout::left_to_right(Align::TOP)
    };
    ui.with_layout(layout, |row| {
        egui::Frame::none()
            .fill(if message.is_own_message { OWN_BUBBLE } else { PEER_BUBBLE })
            .rounding(8.0)
            .inner_margin(8.0)
            .show(row, |ui| {
                ui.set_max_width(420.0);
                ui.vertical(|ui| {
                    if !message.is_own_message {
                        ui.label(RichText::new(peer_name).small().strong());
                    }
                    if !message.content.is_empty() {
                        ui.label(message.content.as_str());
                    }
                    for attachment in &message.attachments {
                        let icon = match attachment.kind {
                            AttachmentKind::Image => "🖼",
                            AttachmentKind::File => "📎",
                        };
                        let size = attachment.size.map(human_size).unwrap_or_default();
                        ui.label(RichText::new(format!("{icon} {} {size}", attachment.name)).small());
                    }
                    let marker = match (message.status, message.is_own_message, message.is_read) {
                        (DeliveryStatus::Pending, _, _) => "sending…",
                        (DeliveryStatus::Failed, _, _) => "not sent",
                        (DeliveryStatus::Sent, true, true) => "✓✓ read",
                        (DeliveryStatus::Sent, true, false) => "✓ sent",
                        (DeliveryStatus::Sent, false, _) => "",
                    };
                    ui.horizontal(|meta| {
                        meta.label(RichText::new(message.local_time()).small().color(MUTED));
                        if !marker.is_empty() {
                            let color = if message.status == DeliveryStatus::Failed { DANGER } else { MUTED };
                            meta.label(RichText::new(marker).small().color(color));
                        }
                        if let (DeliveryStatus::Failed, Some(client_id)) = (message.status, message.client_id) {
                            if meta.small_button("Retry").clicked() {
                                intents.push(Intent::Retry(client_id));
                            }
                            if meta.small_button("Discard").clicked() {
                                intents.push(Intent::Discard(client_id));
                            }
                        }
                    });
                });
            });
    });
    ui.add_space(4.0);
}

fn messages_view(
    ctx: &egui::Context,
    messenger: &Messenger,
    form: &mut FormState,
    now: Instant,
    intents: &mut Vec<Intent>,
) {
    egui::TopBottomPanel::top("header").show(ctx, |ui| header(ui, messenger, intents));

    egui::SidePanel::left("threads")
        .resizable(false)
        .default_width(260.0)
        .show(ctx, |ui| {
            ui.horizontal(|row| {
                row.label(RichText::new("Messages").strong());
                if messenger.unread_total() > 0 {
                    row.label(RichText::new(format!("{} unread", messenger.unread_total())).color(ACCENT));
                }
                row.with_layout(Layout::right_to_left(Align::Center), |row| {
                    if row.small_button("Refresh").clicked() {
                        intents.push(Intent::RefreshThreads);
                    }
                });
            });
            if ui
                .add(egui::TextEdit::singleline(&mut form.search).hint_text("Search by name or job"))
                .changed()
            {
                intents.push(Intent::Search(form.search.clone()));
            }
            ui.separator();
            let active = messenger.threads().active();
            egui::ScrollArea::vertical().show(ui, |ui| {
                let visible = messenger.threads().filtered();
                if visible.is_empty() {
                    ui.label(RichText::new("No conversations").color(MUTED));
                }
                for thread in visible {
                    thread_row(ui, thread, active == Some(thread.peer_id), intents);
                }
            });
        });

    egui::CentralPanel::default().show(ctx, |ui| {
        let conversation = messenger.conversation();
        let Some(peer_id) = conversation.peer_id() else {
            ui.centered_and_justified(|ui| {
                ui.label(RichText::new("Select a conversation").color(MUTED));
            });
            return;
        };
        let peer_name = messenger.peer_name(peer_id);
        ui.heading(peer_name.as_str());
        if let Some(job) = messenger.threads().get(peer_id).and_then(|t| t.job_title.as_ref()) {
            ui.label(RichText::new(job).color(ACCENT));
        }
        ui.separator();

        let composer_height = 120.0;
        egui::ScrollArea::vertical()
            .stick_to_bottom(true)
            .auto_shrink([false; 2])
            .max_height((ui.available_height() - composer_height).max(80.0))
            .show(ui, |ui| {
                if conversation.has_more() {
                    ui.vertical_centered(|ui| {
                        if conversation.is_loading_older() {
                            ui.spinner();
                        } else if ui.small_button("Load older messages").clicked() {
                            intents.push(Intent::LoadOlder);
                        }
                    });
                }
                if conversation.phase() == Phase::Loading {
                    ui.vertical_centered(|ui| ui.spinner());
                }
                for message in conversation.messages() {
                    bubble(ui, message, &peer_name, intents);
                }
            });

        let typing_label = if messenger.is_peer_typing(now) {
            format!("{peer_name} is typing...")
        } else {
            String::new()
        };
        ui.label(RichText::new(typing_label).small().color(MUTED));

        let composer = messenger.composer();
        if !composer.staged().is_empty() {
            ui.horizontal_wrapped(|row| {
                for staged in composer.staged() {
                    let chip = format!("{} ({}) ✕", staged.name, human_size(staged.size));
                    if row.small_button(chip).clicked() {
                        intents.push(Intent::Unstage(staged.local_id));
                    }
                }
            });
        }
        ui.horizontal(|row| {
            row.add(
                egui::TextEdit::singleline(&mut form.attach_path)
                    .hint_text("Attach files (paths separated by ;)")
                    .desired_width(280.0),
            );
            if row.button("Attach").clicked() {
                intents.push(Intent::Attach);
            }
        });
        ui.horizontal(|row| {
            let input = row.add(
                egui::TextEdit::singleline(&mut form.draft)
                    .hint_text(format!("Message {peer_name}"))
                    .desired_width(f32::INFINITY),
            );
            if input.changed() {
                intents.push(Intent::Draft(form.draft.clone()));
            }
            let enter = input.lost_focus() && row.input(|i| i.key_pressed(egui::Key::Enter));
            let clicked = row
                .add_enabled(composer.can_submit(), egui::Button::new("Send"))
                .clicked();
            if clicked || enter {
                intents.push(Intent::Send);
                input.request_focus();
            }
        });
    });
}

fn toasts(ctx: &egui::Context, messenger: &Messenger, intents: &mut Vec<Intent>) {
    let visible = messenger.notifications().visible();
    if visible.is_empty() {
        return;
    }
    egui::Area::new(egui::Id::new("toasts"))
        .anchor(Align2::RIGHT_TOP, [-12.0, 48.0])
        .show(ctx, |ui| {
            for toast in visible {
                let accent = match toast.kind {
                    ToastKind::Error => DANGER,
                    ToastKind::Message => ACCENT,
                    ToastKind::Info => MUTED,
                };
                egui::Frame::popup(ui.style())
                    .stroke(egui::Stroke::new(1.0, accent))
                    .show(ui, |ui| {
                        ui.set_max_width(300.0);
                        ui.horizontal(|row| {
                            row.label(RichText::new(&toast.title).strong().color(accent));
                            if row.small_button("✕").clicked() {
                                intents.push(Intent::DismissToast(toast.id));
                            }
                        });
                        if !toast.body.is_empty() {
                            ui.label(toast.body.as_str());
                        }
                    });
                ui.add_space(6.0);
            }
        });
}
