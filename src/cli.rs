use std::sync::OnceLock;
use clap::{
    Parser,
    builder::styling::{
        AnsiColor,
        Effects,
        Styles,
    },
};
use enum_dispatch::enum_dispatch;

use crate::commands::{
    convert::Convert,
    hr::Hr,
    kmesh::Kmesh,
};


pub fn get_style() -> Styles {
    static INSTANCE: OnceLock<Styles> = OnceLock::new();
    INSTANCE.get_or_init(|| {
        Styles::styled()
            .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
            .usage(AnsiColor::Green.on_default()   | Effects::BOLD)
            .literal(AnsiColor::Green.on_default() | Effects::BOLD)
            .placeholder(AnsiColor::BrightBlue.on_default())
            .error(AnsiColor::BrightRed.on_default())
            .valid(AnsiColor::BrightYellow.on_default())
    }).to_owned()
}


#[enum_dispatch]
pub trait OptProcess {
    fn process(&self) -> anyhow::Result<()>;
}


#[enum_dispatch(OptProcess)]
#[derive(Debug, Parser)]
#[command(name = "wan2dmft",
            about = r"Convert Wannier90 tight-binding models into input records of DMFT calculations.",
            version,
            styles = get_style()
            )]
enum Opt {
    Convert,

    Hr,

    Kmesh,
}


pub fn run() -> anyhow::Result<()> {
    Opt::parse().process()
}


#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Opt::command().debug_assert();
    }

    #[test]
    fn test_parse_convert() {
        let opt = Opt::try_parse_from(["wan2dmft", "convert", "SrVO3", "-r", "combined", "--bloch-basis"]).unwrap();
        assert!(matches!(opt, Opt::Convert(_)));

        assert!(Opt::try_parse_from(["wan2dmft", "convert", "SrVO3", "-r", "random"]).is_err());
        assert!(Opt::try_parse_from(["wan2dmft", "convert"]).is_err());
        assert!(Opt::try_parse_from(["wan2dmft", "convert", "--gen-template"]).is_ok());
    }

    #[test]
    fn test_parse_kmesh() {
        assert!(Opt::try_parse_from(["wan2dmft", "kmesh", "--size", "4", "4", "4"]).is_ok());
        assert!(Opt::try_parse_from(["wan2dmft", "kmesh", "--size", "4", "4"]).is_err());
    }
}
