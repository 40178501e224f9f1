// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

extern crate clap;
extern crate env_logger;
#[macro_use]
extern crate failure;
extern crate fractal_aa;
extern crate image;
extern crate itertools;
#[macro_use]
extern crate log;

use clap::{App, Arg, ArgMatches};
use fractal_aa::color::GRADIENT_NAMES;
use fractal_aa::params::parse_assignment;
use fractal_aa::{
    ColorMapper, Complex64, Fractal, FractalParameters, Image, RenderConfig, Renderer, Skew,
    StopGradient,
};
use itertools::Itertools;
use std::path::Path;
use std::str::FromStr;

fn parse_pair<T>(s: &str, separator: char) -> Option<(T, T)>
where
    T: FromStr,
{
    match s.find(separator) {
        None => None,
        Some(index) => match (
            T::from_str(s[..index].trim()),
            T::from_str(s[index + 1..].trim()),
        ) {
            (Ok(l), Ok(r)) => Some((l, r)),
            _ => None,
        },
    }
}

fn parse_complex(s: &str) -> Option<Complex64> {
    parse_pair(s, ',').map(|(re, im)| Complex64::new(re, im))
}

fn parse_skew(s: &str) -> Option<Skew> {
    s.split(',')
        .map(|v| f64::from_str(v.trim()))
        .collect_tuple()
        .and_then(|(a, b, c, d)| match (a, b, c, d) {
            (Ok(a), Ok(b), Ok(c), Ok(d)) => Some(Skew([[a, b], [c, d]])),
            _ => None,
        })
}

fn validate_pair<T: FromStr>(s: &str, separator: char, err: &str) -> Result<(), String> {
    match parse_pair::<T>(s, separator) {
        Some(_) => Ok(()),
        None => Err(err.to_string()),
    }
}

fn validate_number<T: FromStr>(s: &str, err: &str) -> Result<(), String> {
    match T::from_str(s) {
        Ok(_) => Ok(()),
        Err(_) => Err(err.to_string()),
    }
}

const OUTPUT: &str = "output";
const SIZE: &str = "size";
const CENTER: &str = "center";
const ZOOM: &str = "zoom";
const ROTATION: &str = "rotation";
const SKEW: &str = "skew";
const SPAN: &str = "span";
const PASSES: &str = "passes";
const THREADS: &str = "threads";
const FRACTAL: &str = "fractal";
const PARAM: &str = "param";
const GRADIENT: &str = "gradient";

fn args<'a>() -> ArgMatches<'a> {
    App::new("fractal-aa")
        .version("0.1.0")
        .about("Anti-aliased escape-time fractal renderer")
        .arg(
            Arg::with_name(OUTPUT)
                .required(true)
                .long(OUTPUT)
                .short("o")
                .takes_value(true)
                .help("Output file; the extension picks the format (png, ppm)"),
        )
        .arg(
            Arg::with_name(SIZE)
                .long(SIZE)
                .short("s")
                .takes_value(true)
                .default_value("800x600")
                .validator(|s| validate_pair::<u16>(&s, 'x', "Could not parse output image size"))
                .help("Size of output image"),
        )
        .arg(
            Arg::with_name(CENTER)
                .long(CENTER)
                .short("c")
                .takes_value(true)
                .allow_hyphen_values(true)
                .default_value("-0.5,0")
                .validator(|s| validate_pair::<f64>(&s, ',', "Could not parse center point"))
                .help("Point of the complex plane at the middle of the image"),
        )
        .arg(
            Arg::with_name(ZOOM)
                .long(ZOOM)
                .short("z")
                .takes_value(true)
                .default_value("1")
                .validator(|s| validate_number::<f64>(&s, "Could not parse magnification"))
                .help("Magnification"),
        )
        .arg(
            Arg::with_name(ROTATION)
                .long(ROTATION)
                .short("r")
                .takes_value(true)
                .allow_hyphen_values(true)
                .default_value("0")
                .validator(|s| validate_number::<f64>(&s, "Could not parse rotation"))
                .help("Counter-clockwise rotation of the view, in degrees"),
        )
        .arg(
            Arg::with_name(SKEW)
                .long(SKEW)
                .takes_value(true)
                .allow_hyphen_values(true)
                .default_value("1,0,0,1")
                .validator(|s| match parse_skew(&s) {
                    Some(_) => Ok(()),
                    None => Err("Skew must be four comma-separated numbers".to_string()),
                })
                .help("2x2 skew matrix, row-major"),
        )
        .arg(
            Arg::with_name(SPAN)
                .long(SPAN)
                .takes_value(true)
                .default_value("1.5")
                .validator(|s| validate_number::<f64>(&s, "Could not parse span"))
                .help("Half the height of the view at magnification 1"),
        )
        .arg(
            Arg::with_name(PASSES)
                .long(PASSES)
                .short("p")
                .takes_value(true)
                .default_value("64")
                .validator(|s| validate_number::<u32>(&s, "Could not parse pass count"))
                .help("Number of anti-aliasing passes"),
        )
        .arg(
            Arg::with_name(THREADS)
                .long(THREADS)
                .short("t")
                .takes_value(true)
                .validator(|s| validate_number::<usize>(&s, "Could not parse thread count"))
                .help("Number of worker threads (default: one per CPU)"),
        )
        .arg(
            Arg::with_name(FRACTAL)
                .long(FRACTAL)
                .short("f")
                .takes_value(true)
                .default_value("MandelbrotSet")
                .help("Formula: MandelbrotSet, JuliaSet, BurningShip, BurningShipJulia, Manowar, Grid"),
        )
        .arg(
            Arg::with_name(PARAM)
                .long(PARAM)
                .short("P")
                .takes_value(true)
                .multiple(true)
                .number_of_values(1)
                .allow_hyphen_values(true)
                .validator(|s| parse_assignment(&s).map(|_| ()))
                .help("Formula parameter as name=value, e.g. maxIter=500 or seed=-0.4,0.6"),
        )
        .arg(
            Arg::with_name(GRADIENT)
                .long(GRADIENT)
                .short("g")
                .takes_value(true)
                .default_value("standard")
                .possible_values(GRADIENT_NAMES)
                .help("Color gradient"),
        )
        .get_matches()
}

fn write_image(outfile: &str, picture: &Image) -> Result<(), failure::Error> {
    let path = Path::new(outfile);
    image::save_buffer(
        &path,
        &picture.to_rgb8(),
        picture.width as u32,
        picture.height as u32,
        image::ColorType::RGB(8),
    )?;
    Ok(())
}

fn value<'a>(matches: &'a ArgMatches, name: &str) -> Result<&'a str, failure::Error> {
    matches
        .value_of(name)
        .ok_or_else(|| format_err!("missing value for --{}", name))
}

fn parse<T: FromStr>(matches: &ArgMatches, name: &str) -> Result<T, failure::Error> {
    let raw = value(matches, name)?;
    T::from_str(raw).map_err(|_| format_err!("could not parse --{} \"{}\"", name, raw))
}

fn config(matches: &ArgMatches) -> Result<RenderConfig, failure::Error> {
    let (width, height) = parse_pair::<usize>(value(matches, SIZE)?, 'x')
        .ok_or_else(|| format_err!("could not parse image dimensions"))?;
    let center = parse_complex(value(matches, CENTER)?)
        .ok_or_else(|| format_err!("could not parse center point"))?;
    let skew =
        parse_skew(value(matches, SKEW)?).ok_or_else(|| format_err!("could not parse skew"))?;
    Ok(RenderConfig {
        width,
        height,
        center,
        magnification: parse(matches, ZOOM)?,
        rotation: parse(matches, ROTATION)?,
        skew,
        span: parse(matches, SPAN)?,
        passes: parse(matches, PASSES)?,
    })
}

fn run(matches: &ArgMatches) -> Result<(), failure::Error> {
    let config = config(matches)?;

    let mut params = FractalParameters::new();
    if let Some(values) = matches.values_of(PARAM) {
        for assignment in values {
            let (name, setting) = parse_assignment(assignment).map_err(failure::err_msg)?;
            params.set(name, setting);
        }
    }
    let fractal = Fractal::from_name(value(matches, FRACTAL)?, &params)?;

    let gradient_name = value(matches, GRADIENT)?;
    let gradient = StopGradient::preset(gradient_name)
        .ok_or_else(|| format_err!("unknown gradient \"{}\"", gradient_name))?;

    let threads = match matches.value_of(THREADS) {
        Some(_) => parse(matches, THREADS)?,
        None => 0,
    };

    let renderer =
        Renderer::new(config, fractal, ColorMapper::new(gradient))?.with_threads(threads);
    info!(
        "rendering {} at {} ({}x{}, {} passes)",
        fractal.name(),
        config.center,
        config.width,
        config.height,
        config.passes
    );
    let picture = renderer.render()?;

    let output = value(matches, OUTPUT)?;
    write_image(output, &picture)?;
    info!("wrote {}", output);
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let matches = args();
    if let Err(e) = run(&matches) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
