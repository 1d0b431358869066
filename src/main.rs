fn main() -> std::process::ExitCode {
    devotional_lib::run()
}
