use std::env;
use std::process;
use std::time::SystemTime;

use domain::adapters::memory_repo::InMemoryRepo;
use domain::service::SmartLinkService;
use domain::short_id::Base62ShortIdGenerator;
use domain::slug::slugify;
use domain::snapshot::SnapshotConfig;
use domain::validate::{validate, validate_manual_url};
use domain::{Clock, NewSmartLink, PlatformId, PlatformLink, Template};

struct StdClock;
impl Clock for StdClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

fn print_usage() {
    eprintln!(
        "{}\n\nUsage:\n  domain validate <input>\n  domain slugify <text>\n  domain snapshot <artist> <title> <platform=url>... [--base <url>]\n\nNotes:\n  - This demo CLI uses an in-memory repository; data is not persisted across runs.",
        domain::about()
    );
}

fn run() -> Result<(), String> {
    let mut args = env::args().skip(1); // skip program name

    let Some(cmd) = args.next() else {
        print_usage();
        return Ok(());
    };

    match cmd.as_str() {
        "validate" => {
            let Some(input) = args.next() else {
                return Err("missing <input> for validate".into());
            };
            let source = validate(&input).map_err(|e| e.to_string())?;
            match source.platform_hint() {
                Some(p) => println!("{} ({}): {}", source.kind().as_str(), p, source.value()),
                None => println!("{}: {}", source.kind().as_str(), source.value()),
            }
            Ok(())
        }
        "slugify" => {
            let text: Vec<String> = args.collect();
            match slugify(&text.join(" ")) {
                Some(s) => {
                    println!("{}", s);
                    Ok(())
                }
                None => Err("nothing to slugify".into()),
            }
        }
        "snapshot" => {
            let (Some(artist), Some(title)) = (args.next(), args.next()) else {
                return Err("snapshot needs <artist> and <title>".into());
            };
            let mut config = SnapshotConfig {
                site_base_url: "http://localhost:3001".into(),
                ..SnapshotConfig::default()
            };
            let mut platform_links = Vec::new();
            let rest: Vec<String> = args.collect();
            let mut i = 0;
            while i < rest.len() {
                match rest[i].as_str() {
                    "--base" => {
                        if i + 1 >= rest.len() {
                            return Err("--base requires a url".into());
                        }
                        config.site_base_url = rest[i + 1].clone();
                        i += 2;
                    }
                    pair => {
                        let Some((key, url)) = pair.split_once('=') else {
                            return Err(format!("expected platform=url, got: {}", pair));
                        };
                        let url = validate_manual_url(url).map_err(|e| e.to_string())?;
                        platform_links.push(PlatformLink {
                            platform: PlatformId::from_key(key),
                            url,
                        });
                        i += 1;
                    }
                }
            }

            let svc = SmartLinkService::new(
                InMemoryRepo::new(),
                Base62ShortIdGenerator::new(6),
                StdClock,
            );
            let link = svc
                .create(NewSmartLink {
                    artist_name: artist,
                    track_title: title,
                    album_name: None,
                    isrc: None,
                    release_date: None,
                    cover_image_url: None,
                    description: None,
                    platform_links,
                    tracking: None,
                    custom_slug: None,
                    template: Template::Standard,
                    primary_color: None,
                    background_color: None,
                    is_published: true,
                })
                .map_err(|e| format!("create failed: {}", e))?;
            let snapshot = svc
                .publish_snapshot(&link.short_id, &config)
                .map_err(|e| format!("snapshot failed: {}", e))?;
            eprintln!("{} -> {}", snapshot.url, link.canonical_path());
            println!("{}", snapshot.html);
            Ok(())
        }
        _ => {
            print_usage();
            Ok(())
        }
    }
}

fn main() {
    if let Err(msg) = run() {
        eprintln!("error: {}", msg);
        process::exit(1);
    }
}
