use tish::Interpreter;

fn main() {
    let mut shell = Interpreter::default();
    if let Err(e) = shell.repl() {
        eprintln!("tish: {:#}", e);
        std::process::exit(1);
    }
}
