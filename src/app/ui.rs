use super::{DataLoadApp, RunProgress};
use eframe::egui::{self, Color32, RichText};
use rfd::FileDialog;

impl DataLoadApp {
    pub fn render(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                ui.add_space(20.0);
                ui.vertical_centered(|ui| {
                    ui.heading("Data Load UI");
                    ui.add_space(5.0);
                    ui.label(
                        RichText::new("Upload spreadsheet test data to a Salesforce sandbox")
                            .color(ui.visuals().text_color().gamma_multiply(0.7)),
                    );
                });

                ui.add_space(20.0);
                self.render_form(ui);
                ui.add_space(20.0);
                self.render_actions(ui);
                ui.add_space(10.0);
                self.render_error(ui);
                ui.add_space(10.0);
                self.render_log(ui);
                ui.add_space(20.0);
            });
        });
    }

    fn render_form(&mut self, ui: &mut egui::Ui) {
        ui.group(|ui| {
            ui.horizontal(|ui| {
                if ui.button("📁 Select File").clicked() {
                    if let Some(path) = FileDialog::new()
                        .add_filter("Excel files", &["xlsx"])
                        .add_filter("All files", &["*"])
                        .pick_file()
                    {
                        println!("Selected spreadsheet: {}", path.display());
                        self.excel_file = Some(path);
                    }
                }
                match self.excel_file_name() {
                    Some(name) => {
                        ui.label(name);
                    }
                    None => {
                        ui.label(
                            RichText::new("No file selected")
                                .color(ui.visuals().text_color().gamma_multiply(0.5)),
                        );
                    }
                }
            });

            ui.add_space(10.0);

            egui::Grid::new("credentials")
                .num_columns(2)
                .spacing([10.0, 6.0])
                .show(ui, |ui| {
                    ui.label("Username");
                    ui.add(egui::TextEdit::singleline(&mut self.username).desired_width(240.0));
                    ui.end_row();

                    ui.label("Password");
                    ui.add(
                        egui::TextEdit::singleline(&mut self.password)
                            .password(true)
                            .desired_width(240.0),
                    );
                    ui.end_row();

                    ui.label("Security token");
                    ui.add(
                        egui::TextEdit::singleline(&mut self.security_token)
                            .password(true)
                            .desired_width(240.0),
                    );
                    ui.end_row();
                });

            ui.add_space(6.0);
            ui.checkbox(&mut self.create_users, "Also create user records");
        });
    }

    fn render_actions(&mut self, ui: &mut egui::Ui) {
        ui.vertical_centered(|ui| {
            if self.state.is_running() {
                ui.add(egui::Spinner::new());
                ui.add_space(5.0);
                let cancel = egui::Button::new("✖ Cancel").min_size(egui::vec2(200.0, 32.0));
                if ui.add_enabled(!self.state.cancel_requested, cancel).clicked() {
                    self.cancel_upload();
                }
            } else {
                let button = egui::Button::new("📤 Upload").min_size(egui::vec2(200.0, 40.0));
                if ui.add(button).clicked() {
                    self.start_upload();
                }
            }

            let status = self.state.status_text();
            if !status.is_empty() {
                ui.add_space(8.0);
                ui.label(status);
            }

            if !self.state.is_running() && !matches!(self.state.progress, RunProgress::NotStarted)
            {
                ui.add_space(5.0);
                if ui.button("🗑 Clear Log").clicked() {
                    self.state.clear();
                }
            }
        });
    }

    fn render_error(&mut self, ui: &mut egui::Ui) {
        if let Some(error) = &self.state.error_message {
            ui.vertical_centered(|ui| {
                ui.colored_label(Color32::from_rgb(220, 50, 50), error);
            });
        }
    }

    fn render_log(&mut self, ui: &mut egui::Ui) {
        if self.state.log.is_empty() && self.state.diagnostics.is_empty() {
            return;
        }

        ui.group(|ui| {
            ui.label("Log");
            egui::ScrollArea::vertical()
                .id_source("log")
                .max_height(200.0)
                .stick_to_bottom(true)
                .show(ui, |ui| {
                    ui.add(
                        egui::TextEdit::multiline(&mut self.state.log.as_str())
                            .font(egui::TextStyle::Monospace)
                            .desired_width(ui.available_width()),
                    );
                });

            if !self.state.diagnostics.is_empty() {
                ui.add_space(8.0);
                ui.label("Diagnostics");
                egui::ScrollArea::vertical()
                    .id_source("diagnostics")
                    .max_height(120.0)
                    .stick_to_bottom(true)
                    .show(ui, |ui| {
                        ui.add(
                            egui::TextEdit::multiline(&mut self.state.diagnostics.as_str())
                                .font(egui::TextStyle::Monospace)
                                .text_color(Color32::from_rgb(220, 50, 50))
                                .desired_width(ui.available_width()),
                        );
                    });
            }
        });
    }
}
