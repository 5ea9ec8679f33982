mod app;
mod upload;

use app::DataLoadApp;

fn main() -> Result<(), eframe::Error> {
    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_inner_size([540.0, 580.0])
            .with_min_inner_size([440.0, 480.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Data Load UI",
        options,
        Box::new(|cc| Box::new(DataLoadApp::new(cc))),
    )
}
