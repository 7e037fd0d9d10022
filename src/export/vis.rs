//! マッチング結果の可視化画像
//!
//! 2枚を横並びに連結し、対応点同士を緑の線で結ぶ。
//! 右側画像は左側の高さに合わせて縮尺する。

use image::{imageops, Rgb, RgbImage};

const MATCH_LINE_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

/// 横並び合成画像を作り、対応点を線で結ぶ
///
/// `points` は (画像Aの座標, 画像Bの座標) のペア。座標はそれぞれの
/// 元画像スケールで渡し、縮尺と横オフセットはここで処理する。
pub fn render_pair(
    image_a: &RgbImage,
    image_b: &RgbImage,
    points: &[((f32, f32), (f32, f32))],
) -> RgbImage {
    let (width_a, height_a) = image_a.dimensions();
    let (width_b, height_b) = image_b.dimensions();

    let (scaled_b, scale_x, scale_y) = if height_b == height_a {
        (image_b.clone(), 1.0f32, 1.0f32)
    } else {
        let new_width = ((width_b as u64 * height_a as u64) / height_b.max(1) as u64).max(1) as u32;
        let resized = imageops::resize(
            image_b,
            new_width,
            height_a,
            imageops::FilterType::Triangle,
        );
        (
            resized,
            new_width as f32 / width_b as f32,
            height_a as f32 / height_b as f32,
        )
    };

    let mut canvas = RgbImage::new(width_a + scaled_b.width(), height_a);
    imageops::replace(&mut canvas, image_a, 0, 0);
    imageops::replace(&mut canvas, &scaled_b, width_a as i64, 0);

    for &((ax, ay), (bx, by)) in points {
        let x0 = ax.round() as i64;
        let y0 = ay.round() as i64;
        let x1 = (bx * scale_x).round() as i64 + width_a as i64;
        let y1 = (by * scale_y).round() as i64;
        draw_line(&mut canvas, x0, y0, x1, y1, MATCH_LINE_COLOR);
    }

    canvas
}

/// Bresenhamの直線描画。キャンバス外の画素は描かない
fn draw_line(canvas: &mut RgbImage, x0: i64, y0: i64, x1: i64, y1: i64, color: Rgb<u8>) {
    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    let (mut x, mut y) = (x0, y0);
    loop {
        if x >= 0 && y >= 0 && (x as u32) < canvas.width() && (y as u32) < canvas.height() {
            canvas.put_pixel(x as u32, y as u32, color);
        }

        if x == x1 && y == y1 {
            break;
        }

        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}
