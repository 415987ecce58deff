const COMMANDS: &[&str] = &[
  "get_initial_text",
  "get_initial_file",
  "reset",
  "listen",
  "cancel",
  "request",
];

fn main() {
  tauri_plugin::Builder::new(COMMANDS)
    .android_path("android")
    .ios_path("ios")
    .build();
}
