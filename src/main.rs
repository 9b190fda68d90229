use clap::{
    crate_authors, crate_description, crate_name, crate_version, Arg, ArgAction, ArgMatches,
    Command,
};
use std::path::Path;

// The CLI layer should only parse inputs and forward them to library code.
fn main() -> miette::Result<()> {
    let matches = Command::new(crate_name!())
        .about(crate_description!())
        .author(crate_authors!())
        .version(crate_version!())
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand_required(true)
        .subcommand(
            Command::new("contents")
                .visible_alias("ctnt")
                .about("Creates the contents node in an existing package.xml")
                // presence is checked by the library so its messages are the ones shown
                .arg(
                    Arg::new("templatefile")
                        .short('T')
                        .long("templatefile")
                        .value_name("TEMPLATEFILE")
                        .help("Path to template package2.xml"),
                )
                .arg(
                    Arg::new("srcdir")
                        .short('S')
                        .long("srcdir")
                        .value_name("SRCDIR")
                        .help("Path to source code folder"),
                )
                .arg(
                    Arg::new("destinationdir")
                        .short('D')
                        .long("destinationdir")
                        .value_name("DESTINATIONDIR")
                        .help("Path to destination folder where to save the generated package.xml"),
                )
                .arg(
                    Arg::new("dirroles")
                        .short('R')
                        .long("dirroles")
                        .value_name("DIRROLES")
                        .help("Roles configuration e.g. directory:role;directory:role;..."),
                )
                .arg(
                    Arg::new("config")
                        .short('c')
                        .long("config")
                        .value_name("CONFIG")
                        .help("TOML file overriding the built-in roles and defaults"),
                )
                .arg(
                    Arg::new("preview")
                        .short('p')
                        .long("preview")
                        .help("Print the files and roles that would be written, write nothing")
                        .action(ArgAction::SetTrue),
                ),
        )
        .get_matches();

    let is_verbose = matches.get_flag("verbose");

    init_logger(is_verbose);

    match matches.subcommand() {
        Some(("contents", args)) => handle_contents(args)?,
        _ => unreachable!(),
    }

    Ok(())
}

fn init_logger(is_verbose: bool) {
    let level = if is_verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };

    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn handle_contents(args: &ArgMatches) -> Result<(), pearcontents::PearContentsError> {
    let raw = pearcontents::RawOptions {
        templatefile: args.get_one::<String>("templatefile").cloned(),
        srcdir: args.get_one::<String>("srcdir").cloned(),
        destinationdir: args.get_one::<String>("destinationdir").cloned(),
        dirroles: args.get_one::<String>("dirroles").cloned(),
    };

    let settings_path = args.get_one::<String>("config").map(Path::new);

    if args.get_flag("preview") {
        return pearcontents::preview_contents(&raw, settings_path);
    }

    pearcontents::generate_contents(&raw, settings_path)?;

    println!("{}", pearcontents::SUCCESS_MESSAGE);

    Ok(())
}
