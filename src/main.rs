use replycard::cli::Cli;

fn main() {
    Cli::run();
}
