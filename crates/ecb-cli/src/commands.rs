//! Command execution.

use std::fs;
use std::io::Write;
use std::path::Path;

use ecb_client::{BadgeClient, BadgeError, ClientConfig, HttpUpdateServer};
use ecb_image::{encode_bitmap, write_bitmap, HardwareColor, PackedImage};
use ecb_protocol::{
    Color, DeviceInfo, LedBorderInfo, LedBorderPattern, PatternFill, PatternKind,
    DEFAULT_GRADIENT_SIZE, LED_COLOR_SLOTS,
};
use tracing::info;

use crate::args::{CliArgs, CliCommand, LedAction};
use crate::error::CliError;

/// Load the configuration file, if any, and apply command-line overrides.
pub fn load_config(args: &CliArgs) -> Result<ClientConfig, CliError> {
    let mut config = match &args.config {
        Some(path) => ClientConfig::load(path)?,
        None => ClientConfig::default(),
    };
    if let Some(address) = &args.address {
        config.address = address.clone();
    }
    Ok(config)
}

/// Run the parsed command line, writing results to `out`.
pub fn run(args: CliArgs, out: &mut dyn Write) -> Result<(), CliError> {
    let config = load_config(&args)?;

    if let CliCommand::Config = args.command {
        write!(out, "{}", serde_yaml::to_string(&config)?)?;
        return Ok(());
    }

    info!("connecting to {}", config.address);
    let client = BadgeClient::connect(config)?;
    execute(&client, args.command, out)
}

/// Run one command against a connected badge.
pub fn execute(client: &BadgeClient, command: CliCommand, out: &mut dyn Write) -> Result<(), CliError> {
    match command {
        CliCommand::Config => {
            write!(out, "{}", serde_yaml::to_string(client.config())?)?;
        }
        CliCommand::Info => {
            let info = client.info()?;
            write!(out, "{}", format_info(&info))?;
        }
        CliCommand::Ping => {
            client.ping()?;
            writeln!(out, "PONG")?;
        }
        CliCommand::SetOwner { owner } => client.set_owner(&owner)?,
        CliCommand::SetContact { contact } => client.set_contact(&contact)?,
        CliCommand::SetBluetooth { name, pin } => client.set_bluetooth(&name, &pin)?,
        CliCommand::FactoryReset => client.factory_reset()?,
        CliCommand::ClearDisplay => client.clear_display()?,
        CliCommand::PushImage { file, name } => {
            let image = read_image(&file)?;
            let name = name.unwrap_or_else(|| image_name(&file));
            client.push_image(&name, &image, |sent, total| {
                info!("sent {}/{} bytes", sent, total);
            })?;
            writeln!(out, "stored {}", name)?;
        }
        CliCommand::FetchImage { name, output } => {
            let image = client.fetch_image(&name)?;
            let order = client.config().nibble_order;
            for (color, count) in color_histogram(&image.codes(order)) {
                info!("{:?}: {} pixels", color, count);
            }
            fs::write(&output, write_bitmap(&image, order)).map_err(|source| CliError::File {
                path: output.clone(),
                source,
            })?;
            writeln!(out, "wrote {}", output.display())?;
        }
        CliCommand::ListImages { start, count } => {
            for name in client.list_images(start, count)? {
                writeln!(out, "{}", name)?;
            }
        }
        CliCommand::SelectImage { name } => client.select_image(&name)?,
        CliCommand::RemoveImage { name } => client.remove_image(&name)?,
        CliCommand::Led { action } => execute_led(client, action, out)?,
        CliCommand::Update { check_only } => update(client, check_only, out)?,
    }
    Ok(())
}

fn execute_led(client: &BadgeClient, action: LedAction, out: &mut dyn Write) -> Result<(), CliError> {
    match action {
        LedAction::Info => {
            let info = client.led_info()?;
            write!(out, "{}", format_led_info(&info))?;
        }
        LedAction::Enable => client.set_led_enabled(true)?,
        LedAction::Disable => client.set_led_enabled(false)?,
        LedAction::Brightness { percent } => client.set_brightness(percent)?,
        LedAction::Pattern { plain, segment } => {
            let pattern = parse_pattern(plain.as_deref(), &segment)?;
            client.set_pattern(&pattern)?;
        }
        LedAction::AddAnimation { anim_type, param } => client.add_animation(anim_type, param)?,
        LedAction::RemoveAnimation { index } => client.remove_animation(index)?,
        LedAction::ClearAnimations => client.clear_animations()?,
    }
    Ok(())
}

fn update(client: &BadgeClient, check_only: bool, out: &mut dyn Write) -> Result<(), CliError> {
    let server =
        HttpUpdateServer::new(&client.config().update).map_err(BadgeError::UpdateMetadata)?;
    let updater = client.updater(server);
    let transaction = updater.prepare()?;
    writeln!(
        out,
        "update available: {} -> {} ({} bytes)",
        transaction.current_version(),
        transaction.new_version(),
        transaction.binary_len()
    )?;

    if check_only {
        transaction.cancel()?;
        return Ok(());
    }

    let version = transaction.new_version().to_string();
    transaction.apply(|sent, total| info!("flashed {}/{} bytes", sent, total))?;
    writeln!(out, "updated to {}", version)?;
    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

fn read_image(path: &Path) -> Result<PackedImage, CliError> {
    let data = fs::read(path).map_err(|source| CliError::File {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(encode_bitmap(&data)?)
}

/// Default image name: the file stem.
pub fn image_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string())
}

/// Pixel counts per hardware color, skipping colors that do not appear.
pub fn color_histogram(codes: &[u8]) -> Vec<(HardwareColor, usize)> {
    HardwareColor::ALL
        .iter()
        .map(|&color| (color, codes.iter().filter(|&&c| c == color.code()).count()))
        .filter(|&(_, count)| count > 0)
        .collect()
}

/// Build a pattern from `--plain COLOR` or up to four `--segment START:END:SIZE`.
pub fn parse_pattern(plain: Option<&str>, segments: &[String]) -> Result<LedBorderPattern, CliError> {
    if let Some(color) = plain {
        return Ok(LedBorderPattern::plain(color.parse()?));
    }

    let kind = match segments.len() {
        1 => PatternKind::Grad1,
        2 => PatternKind::Grad2,
        3 => PatternKind::Grad3,
        4 => PatternKind::Grad4,
        n => {
            return Err(CliError::Argument(format!(
                "expected --plain or 1 to {} segments, got {}",
                LED_COLOR_SLOTS, n
            )))
        }
    };

    let mut start = [Color::WHITE; LED_COLOR_SLOTS];
    let mut end = [Color::WHITE; LED_COLOR_SLOTS];
    let mut sizes = [DEFAULT_GRADIENT_SIZE; LED_COLOR_SLOTS];
    for (slot, segment) in segments.iter().enumerate() {
        let parts: Vec<&str> = segment.split(':').collect();
        let [from, to, size] = parts.as_slice() else {
            return Err(CliError::Argument(format!("bad segment {:?}", segment)));
        };
        start[slot] = from.parse()?;
        end[slot] = to.parse()?;
        sizes[slot] = size
            .parse()
            .map_err(|_| CliError::Argument(format!("bad segment size {:?}", size)))?;
    }

    LedBorderPattern::gradient(kind, start, end, sizes)
        .ok_or_else(|| CliError::Argument("gradient needs a gradient kind".to_string()))
}

pub fn format_info(info: &DeviceInfo) -> String {
    format!(
        "owner:      {}\ncontact:    {}\nfirmware:   {}\nhardware:   {}\nled border: {}\nimage:      {}\nbt pin:     {}\n",
        info.owner,
        info.contact,
        info.sw_version,
        info.hw_version,
        if info.led_enabled { "on" } else { "off" },
        info.current_image,
        info.bt_pin,
    )
}

pub fn format_led_info(info: &LedBorderInfo) -> String {
    let mut text = format!(
        "enabled:    {}\nbrightness: {}%\n",
        if info.enabled { "yes" } else { "no" },
        info.brightness
    );

    let pattern = &info.pattern;
    match pattern.fill() {
        PatternFill::Plain(color) => text.push_str(&format!("pattern:    plain {}\n", color)),
        PatternFill::Gradient(sizes) => {
            let segments = pattern.kind().code() as usize;
            text.push_str(&format!("pattern:    {:?}\n", pattern.kind()));
            for slot in 0..segments {
                text.push_str(&format!(
                    "  segment {}: {} -> {} size {}\n",
                    slot, pattern.start[slot], pattern.end[slot], sizes[slot]
                ));
            }
        }
    }

    match &info.animations {
        Some(animations) => {
            for animation in animations.iter() {
                text.push_str(&format!(
                    "animation {}: type {} param {}\n",
                    animation.index, animation.anim_type, animation.param
                ));
            }
        }
        None => text.push_str("animations: unavailable\n"),
    }
    text
}
